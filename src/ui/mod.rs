pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, header, info, kind_label, muted, section, success, warn};
pub use table::{id_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
