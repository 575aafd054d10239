use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }
            pub fn from_str(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(DeviceId);
id_newtype!(GuideId);
id_newtype!(StepId);
id_newtype!(RecordId);
id_newtype!(InquiryId);
id_newtype!(EngineerId);

/// Step id stamped on inquiries that are not tied to any step.
pub const UNKNOWN_STEP: &str = "unknown";

impl StepId {
    pub fn unknown() -> Self {
        Self(UNKNOWN_STEP.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_STEP
    }
}
