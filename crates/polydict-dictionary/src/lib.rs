pub mod loader;
pub mod program;
pub mod wiki;
pub mod wordlist;

pub use loader::{build_group, group_names, load_registry};
pub use program::ProgramDictionary;
pub use wiki::WikiDictionary;
pub use wordlist::{Entry, UnavailableDictionary, WordListDictionary};
