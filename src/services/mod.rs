pub mod cleanup;
pub mod health;
pub mod notifier;
pub mod queue;
pub mod recognition;
pub mod telegram;
