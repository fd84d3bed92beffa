/// Per-loop compile-time context. `start` is the chunk offset `continue`
/// and the loop's own back-edge jump to; `scope_depth` is the scope depth
/// in effect when the loop body begins, used to know how many locals
/// `continue`/`break` must pop without removing them from the frame's
/// locals table. `breaks` collects the offsets of `break`'s forward jumps,
/// patched to the loop's exit once the loop finishes compiling.
pub struct LoopContext {
    pub start: usize,
    pub scope_depth: usize,
    pub breaks: Vec<usize>,
}

impl LoopContext {
    pub fn new(start: usize, scope_depth: usize) -> Self {
        Self {
            start,
            scope_depth,
            breaks: Vec::new(),
        }
    }
}
