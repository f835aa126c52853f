// CLI command handlers

pub mod api_key;
pub mod generate;
pub mod inspect;

// Re-export commonly used items
pub use generate::GenerateArgs;
pub use inspect::InspectArgs;
