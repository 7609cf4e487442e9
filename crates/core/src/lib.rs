pub mod item;
pub mod money;
pub mod session;
pub mod split;

pub use item::{BillItem, ItemId, PersonId};
pub use money::Money;
pub use session::{AnalysisPermit, BillSession, SharedSession};
pub use split::{person_total, totals_by_person};
