//! Job status codes as they appear on the wire and in the `jobs` table.
//!
//! The codes are not contiguous: the gaps group them into request-lifecycle
//! codes (`0`..`103`) and terminal failure codes (`800`..`9999`). Codes only
//! ever move upward for a given job; see [`JobStatus::can_transition_to`].

/// Status code type matching SMALLINT in the database.
pub type StatusCode = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the wire/database status code.
            pub fn code(self) -> StatusCode {
                self as StatusCode
            }

            /// Decode a raw status code, if it is a known one.
            pub fn from_code(code: StatusCode) -> Option<Self> {
                match code {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusCode {
            fn from(value: $name) -> Self {
                value as StatusCode
            }
        }
    };
}

define_status_enum! {
    /// Lifecycle of one submitted job.
    JobStatus {
        /// Record exists, nothing dispatched yet.
        Created = 0,
        /// Parked until the client delivers the binary for its upload slot.
        WaitingForUpload = 101,
        /// Forwarded to an execution backend.
        Running = 102,
        /// Result produced; the only successful terminal state.
        Done = 103,
        /// The backend no longer knows the job.
        Gone = 800,
        /// The backend refused access to the job.
        NoAccess = 900,
        /// Killed on the backend.
        Killed = 950,
        /// The backend stopped reporting progress.
        Hanging = 960,
        /// Generic terminal failure.
        Error = 9999,
    }
}

impl JobStatus {
    /// Whether a job in this state may move to `next`.
    ///
    /// Transitions are one-directional and no state is revisited, which the
    /// code ordering encodes directly: a transition is legal only when the
    /// target code is strictly greater.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        next.code() > self.code()
    }
}
