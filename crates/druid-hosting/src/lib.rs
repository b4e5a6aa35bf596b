#![deny(unsafe_code)]
#![doc = "druid-hosting: 装配组件 Operator，并把单次调谐结果映射为重排节奏。"]

pub mod builder;
pub mod reconciler;
pub mod registry;

pub use builder::{BuildError, ReconcilerBuilder};
pub use reconciler::{ComponentReconciler, ReconcileOutcome, SUSPEND_RECONCILE_ANNOTATION};
pub use registry::{OperatorRegistry, RegistrationError};
