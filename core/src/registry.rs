//! Explicit backend registration: the hosting application assembles the
//! kind -> factory table at startup and injects it; nothing is discovered
//! at runtime.

use crate::error::{QuarryError, QuarryResult};
use crate::exec::Executor;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Column,
    Document,
    Graph,
    KeyValue,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Column => "column",
            Self::Document => "document",
            Self::Graph => "graph",
            Self::KeyValue => "key-value",
        }
    }
}

type ExecutorFactory = Box<dyn Fn() -> Box<dyn Executor> + Send + Sync>;

#[derive(Default)]
pub struct BackendRegistry {
    factories: HashMap<BackendKind, ExecutorFactory>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, kind: BackendKind, factory: F)
    where
        F: Fn() -> Box<dyn Executor> + Send + Sync + 'static,
    {
        self.factories.insert(kind, Box::new(factory));
    }

    pub fn contains(&self, kind: BackendKind) -> bool {
        self.factories.contains_key(&kind)
    }

    pub fn create(&self, kind: BackendKind) -> QuarryResult<Box<dyn Executor>> {
        self.factories.get(&kind).map(|factory| factory()).ok_or_else(|| {
            QuarryError::UnsupportedOperation(format!(
                "no backend registered for {}",
                kind.as_str()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::MemoryExecutor;

    #[test]
    fn test_registered_kind_creates_executor() {
        let mut registry = BackendRegistry::new();
        registry.register(BackendKind::Document, || Box::new(MemoryExecutor::new()));

        assert!(registry.contains(BackendKind::Document));
        assert!(registry.create(BackendKind::Document).is_ok());
    }

    #[test]
    fn test_unregistered_kind_is_unsupported() {
        let registry = BackendRegistry::new();
        assert!(matches!(
            registry.create(BackendKind::Graph),
            Err(QuarryError::UnsupportedOperation(_))
        ));
    }
}
