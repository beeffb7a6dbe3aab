pub mod archive;
pub mod errors;
pub mod model;

pub use archive::FeedArchive;
pub use errors::FeedError;
pub use model::{
    CalendarDateRecord, CalendarRecord, FeedRecord, RouteRecord, Row, StopRecord, StopTimeRecord,
    TripRecord,
};
