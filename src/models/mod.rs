pub mod activity;
pub mod category;
pub mod loops;
pub mod template;

pub use activity::{ActivityInstance, ActivityStatus, Quantity, SubItem};
pub use category::Category;
pub use loops::{Loop, NotificationSettings, ScheduleSettings};
pub use template::{ActivityTemplate, LinkedTarget};
