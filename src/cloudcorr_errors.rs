use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudCorrError {
    #[error("No candidate observation for {key} (target {target})")]
    NotFound { key: String, target: String },

    #[error("Point ({x}, {y}) lies outside the boundary domain [{min}, {max}]")]
    Domain { x: f64, y: f64, min: f64, max: f64 },

    #[error("Division by a zero total while computing {0}")]
    Division(String),

    #[error("No valid entries to summarise: {0}")]
    EmptyInput(String),

    #[error("Invalid bit range: {0}")]
    InvalidBitRange(String),

    #[error("Julian day {day} is out of range for year {year}")]
    DayOutOfRange { year: i32, day: u32 },

    #[error("Invalid day specification: {0}")]
    InvalidDaySpec(String),

    #[error("Invalid time of day: {0}")]
    InvalidTimeOfDay(String),

    #[error("Invalid observation key: {0}")]
    InvalidKey(String),

    #[error("Invalid station coordinates: {0}")]
    InvalidStation(String),

    #[error("Invalid decision boundary: {0}")]
    InvalidBoundary(String),

    #[error("Invalid platform descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Essential layer {0} is missing from the scene")]
    MissingLayer(String),

    #[error("Array shapes differ: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("Count {count} exceeds total {total}")]
    PercentOutOfRange { count: f64, total: f64 },

    #[error("Archive access failed: {0}")]
    Archive(String),

    #[error("Processing of {key} failed: {source}")]
    ForKey {
        key: String,
        #[source]
        source: Box<CloudCorrError>,
    },
}

impl CloudCorrError {
    /// Attach the observation key to an error raised while processing one day.
    pub fn for_key(self, key: impl ToString) -> Self {
        CloudCorrError::ForKey {
            key: key.to_string(),
            source: Box::new(self),
        }
    }

    /// Strip any [`CloudCorrError::ForKey`] wrappers and return the underlying error.
    pub fn root(&self) -> &CloudCorrError {
        match self {
            CloudCorrError::ForKey { source, .. } => source.root(),
            other => other,
        }
    }
}

impl PartialEq for CloudCorrError {
    fn eq(&self, other: &Self) -> bool {
        use CloudCorrError::*;
        match (self, other) {
            (NotFound { key: a, target: ta }, NotFound { key: b, target: tb }) => {
                a == b && ta == tb
            }
            (
                Domain {
                    x: xa,
                    y: ya,
                    min: mina,
                    max: maxa,
                },
                Domain {
                    x: xb,
                    y: yb,
                    min: minb,
                    max: maxb,
                },
            ) => xa == xb && ya == yb && mina == minb && maxa == maxb,
            (Division(a), Division(b)) => a == b,
            (EmptyInput(a), EmptyInput(b)) => a == b,
            (InvalidBitRange(a), InvalidBitRange(b)) => a == b,
            (DayOutOfRange { year: ya, day: da }, DayOutOfRange { year: yb, day: db }) => {
                ya == yb && da == db
            }
            (InvalidDaySpec(a), InvalidDaySpec(b)) => a == b,
            (InvalidTimeOfDay(a), InvalidTimeOfDay(b)) => a == b,
            (InvalidKey(a), InvalidKey(b)) => a == b,
            (InvalidStation(a), InvalidStation(b)) => a == b,
            (InvalidBoundary(a), InvalidBoundary(b)) => a == b,
            (InvalidDescriptor(a), InvalidDescriptor(b)) => a == b,
            (MissingLayer(a), MissingLayer(b)) => a == b,
            (
                ShapeMismatch {
                    left: la,
                    right: ra,
                },
                ShapeMismatch {
                    left: lb,
                    right: rb,
                },
            ) => la == lb && ra == rb,
            (
                PercentOutOfRange {
                    count: ca,
                    total: ta,
                },
                PercentOutOfRange {
                    count: cb,
                    total: tb,
                },
            ) => ca == cb && ta == tb,
            (Archive(a), Archive(b)) => a == b,
            (ForKey { key: a, source: sa }, ForKey { key: b, source: sb }) => a == b && sa == sb,

            _ => false,
        }
    }
}
