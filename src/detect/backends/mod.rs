pub mod bright_spot;
pub mod scripted;
pub mod stub;

pub use bright_spot::BrightSpotBackend;
pub use scripted::ScriptedBackend;
pub use stub::StubBackend;
