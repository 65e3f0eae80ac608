// Adapters layer: concrete implementations of the domain ports (storage, scaler, model).

pub mod regressor;
pub mod scaler;
pub mod storage;

pub use regressor::{Aggregation, LinearModel, RegressionTree, Regressor, TreeEnsemble};
pub use scaler::StandardScaler;
pub use storage::LocalStorage;
