//! Resolved engine configuration.

use serde::{Deserialize, Serialize};

use crate::full::TaskExecutionOrder;

/// Resolved configuration of a full check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOptions {
    /// Whether to track chain ownership and scan for orphan and shared chains.
    pub check_property_owners: bool,
    /// How the store tasks are scheduled.
    pub execution_order: TaskExecutionOrder,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            check_property_owners: false,
            execution_order: TaskExecutionOrder::MultiThreaded,
        }
    }
}

impl CheckOptions {
    /// Resolves the boolean toggles a config file or command line carries.
    ///
    /// Multiple passes take precedence over single threaded; with neither set
    /// the tasks run multi threaded.
    pub fn from_flags(check_property_owners: bool, single_threaded: bool, multiple_passes: bool) -> Self {
        let execution_order = if multiple_passes {
            TaskExecutionOrder::MultiPass
        } else if single_threaded {
            TaskExecutionOrder::SingleThreaded
        } else {
            TaskExecutionOrder::MultiThreaded
        };
        Self {
            check_property_owners,
            execution_order,
        }
    }

    /// Same options with ownership tracking toggled.
    pub fn with_property_owners(mut self, enabled: bool) -> Self {
        self.check_property_owners = enabled;
        self
    }

    /// Same options with a different execution order.
    pub fn with_execution_order(mut self, order: TaskExecutionOrder) -> Self {
        self.execution_order = order;
        self
    }
}
