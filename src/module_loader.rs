/// Pluggable collaborator invoked by `OP_IMPORT`. Mirrors the
/// `BackendService` pattern: the VM owns a trait object and defers the
/// actual behavior to whatever the embedder supplies. Resolving a real
/// module graph is out of scope here — the default implementation only
/// has to prove the opcode fires with the right name.
pub trait ModuleLoader {
    fn load(&mut self, name: &str);
}

/// Records requested module names without resolving them.
#[derive(Default)]
pub struct RecordingModuleLoader {
    pub requested: Vec<String>,
}

impl ModuleLoader for RecordingModuleLoader {
    fn load(&mut self, name: &str) {
        self.requested.push(name.to_string());
    }
}
