mod edf;
mod fcfs;
mod priority;
mod round_robin;
mod sjf;
#[cfg(test)]
mod test_support;

pub use edf::EarliestDeadlineFirst;
pub use fcfs::FirstComeFirstServed;
pub use priority::Priority;
pub use round_robin::RoundRobin;
pub use sjf::ShortestJobFirst;

use super::traits::SchedPolicy;

/// Identifies one of the five built-in policies, used by configuration
/// and CLI code that needs to select a policy by name rather than
/// construct a trait object directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    RoundRobin,
    Priority,
    ShortestJobFirst,
    FirstComeFirstServed,
    EarliestDeadlineFirst,
}

impl PolicyKind {
    pub fn build(self) -> Box<dyn SchedPolicy> {
        match self {
            PolicyKind::RoundRobin => Box::new(RoundRobin::new()),
            PolicyKind::Priority => Box::new(Priority::new()),
            PolicyKind::ShortestJobFirst => Box::new(ShortestJobFirst::new()),
            PolicyKind::FirstComeFirstServed => Box::new(FirstComeFirstServed::new()),
            PolicyKind::EarliestDeadlineFirst => Box::new(EarliestDeadlineFirst::new()),
        }
    }
}
