pub mod aerodynamics;
pub mod atmosphere;
pub mod table;

pub use aerodynamics::DragPolar;
pub use atmosphere::Atmo;
pub use table::LinearTable;
