/// Root object decode and print command.
pub mod dump;
/// File-level information command.
pub mod info;
/// JSON rendering of decoded value graphs.
pub mod json;
/// Reflection layout inspection command.
pub mod layout;
/// Cycle-safe text rendering of decoded value graphs.
pub mod print;
mod util;

#[cfg(test)]
mod test_support;
