use std::path::PathBuf;
use std::sync::Arc;
use crate::hook::{HookModel, HookPhase, ModeHook};

/// Command line of an isolated hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolatedCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl IsolatedCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone)]
pub enum HookKind {
    InProcess(Arc<dyn ModeHook>),
    Isolated(IsolatedCommand),
}

/// Identity of a registered hook
#[derive(Clone)]
pub struct HookDescriptor {
    pub name: String,
    pub phase: HookPhase,
    pub order: u32,
    pub kind: HookKind,
}

impl HookDescriptor {
    pub fn in_process(hook: Arc<dyn ModeHook>) -> Self {
        Self {
            name: hook.name().to_string(),
            phase: hook.phase(),
            order: hook.order(),
            kind: HookKind::InProcess(hook),
        }
    }

    pub fn isolated(name: impl Into<String>, phase: HookPhase, order: u32, command: IsolatedCommand) -> Self {
        Self {
            name: name.into(),
            phase,
            order,
            kind: HookKind::Isolated(command),
        }
    }

    pub fn model(&self) -> HookModel {
        match self.kind {
            HookKind::InProcess(_) => HookModel::InProcess,
            HookKind::Isolated(_) => HookModel::Isolated,
        }
    }
}

impl std::fmt::Debug for HookDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookDescriptor")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("order", &self.order)
            .field("model", &self.model())
            .finish()
    }
}

/// Registry of hooks, kept sorted by ascending order within each phase.
#[derive(Debug, Default, Clone)]
pub struct HookRegistry {
    begin: Vec<HookDescriptor>,
    end: Vec<HookDescriptor>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: HookDescriptor) {
        let hooks = match descriptor.phase {
            HookPhase::Begin => &mut self.begin,
            HookPhase::End => &mut self.end,
        };
        hooks.push(descriptor);

        // Stable: equal orders keep registration order
        hooks.sort_by_key(|hook| hook.order);
    }

    pub fn register_hook(&mut self, hook: Arc<dyn ModeHook>) {
        self.register(HookDescriptor::in_process(hook));
    }

    pub fn extend(&mut self, descriptors: impl IntoIterator<Item = HookDescriptor>) {
        for descriptor in descriptors {
            self.register(descriptor);
        }
    }

    /// Hooks of `phase` in invocation order, whatever their model.
    pub fn hooks(&self, phase: HookPhase) -> impl Iterator<Item = &HookDescriptor> {
        match phase {
            HookPhase::Begin => self.begin.iter(),
            HookPhase::End => self.end.iter(),
        }
    }

    pub fn count(&self, model: HookModel) -> usize {
        self.begin
            .iter()
            .chain(self.end.iter())
            .filter(|hook| hook.model() == model)
            .count()
    }

    pub fn len(&self) -> usize {
        self.begin.len() + self.end.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
