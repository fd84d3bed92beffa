pub(crate) type ParseFn<T> = fn(&mut T, bool);

pub(crate) struct ParseRule<T> {
    pub(crate) prefix: Option<ParseFn<T>>,
    pub(crate) infix: Option<ParseFn<T>>,
    pub(crate) precedence: Precedence,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Precedence {
    None,
    Assignment, // :=
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * / %
    Power,      // **
    Unary,      // ! -
    Call,       // ()
    Primary,
}

impl Precedence {
    pub(crate) fn increased(&self) -> Self {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Power,
            Power => Unary,
            Unary => Call,
            Call => Primary,
            Primary => Primary,
        }
    }

    pub(crate) fn le(&self, other: &Self) -> bool {
        *self as u8 <= *other as u8
    }
}

impl<T> ParseRule<T> {
    pub(crate) fn new(
        prefix: Option<ParseFn<T>>,
        infix: Option<ParseFn<T>>,
        precedence: Precedence,
    ) -> Self {
        Self {
            prefix,
            infix,
            precedence,
        }
    }
}

impl<T> Default for ParseRule<T> {
    fn default() -> Self {
        Self {
            precedence: Precedence::None,
            prefix: Default::default(),
            infix: Default::default(),
        }
    }
}
