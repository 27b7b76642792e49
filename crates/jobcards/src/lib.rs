//! Job card domain module: workshop jobs from intake to collection.

pub mod job_card;

pub use job_card::{
    AdvanceJobCard, Asset, ItemType, JOB_CARD_TRANSITIONS, JobCard, JobCardAdvanced,
    JobCardCommand, JobCardEvent, JobCardLine, JobCardOpened, JobCardStatus, OpenJobCard,
    Priority, UpdateWork, WorkDetails, WorkUpdated,
};
