pub mod load;
pub mod transition;
pub mod util;
