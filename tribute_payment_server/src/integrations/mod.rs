pub mod telegram;
pub mod tribute;

pub use telegram::TelegramNotifier;
pub use tribute::TributeApi;
