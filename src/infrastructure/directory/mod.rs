mod in_memory_directory;


pub use in_memory_directory::{create_in_memory_directory, InMemoryDirectory};
