pub mod diagnostics;
pub mod expenses;
pub mod floors;
pub mod staff;
pub mod stock;
pub mod suppliers;
