pub mod command_evaluator;
pub mod command_executor;
pub mod echo_executor;

pub use command_evaluator::CommandEvaluator;
pub use command_executor::CommandExecutor;
pub use echo_executor::EchoExecutor;
