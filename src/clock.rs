use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Supplies the reference day ledgers are kept current with.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Which calendar the wall clock is read in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodaySource {
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    source: TodaySource,
}

impl SystemClock {
    pub fn new(source: TodaySource) -> Self {
        Self { source }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        match self.source {
            TodaySource::Local => Local::now().date_naive(),
            TodaySource::Utc => Utc::now().date_naive(),
        }
    }
}

/// Always reports the same day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}
