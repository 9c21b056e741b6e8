use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::roster::Participant;

/// Something that can log in.
pub trait User {
    const RIGHTS: Rights;

    fn id(&self) -> String;
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Participant = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Participant => "participant",
                Self::Admin => "admin",
            }
        )
    }
}

/// The election administrator. There is exactly one, identified by the
/// configured admin code rather than by a roster entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admin;

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;

    fn id(&self) -> String {
        "admin".to_string()
    }
}

impl User for Participant {
    const RIGHTS: Rights = Rights::Participant;

    fn id(&self) -> String {
        self.id.clone()
    }
}
