mod core;
mod cube;
mod depth;
mod gui;
mod program;

pub use self::core::Renderer;
pub use self::program::GpuProgram;
