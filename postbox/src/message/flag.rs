//! # Flag module
//!
//! Module dedicated to message flags. The flag vocabulary follows the
//! IMAP convention: read maps to [`Flag::Seen`] and starred maps to
//! [`Flag::Flagged`].

use std::{
    collections::BTreeSet,
    fmt,
    ops::{Deref, DerefMut},
    str::FromStr,
};

use super::error::Error;

/// The message flag.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum Flag {
    /// The message has been opened.
    Seen,

    /// The message has been answered.
    Answered,

    /// The message has been starred by its owner.
    Flagged,

    /// The message is marked for deletion.
    Deleted,

    /// The message is a draft and therefore not complete.
    Draft,
}

impl Flag {
    /// Return the IMAP wire representation of the flag.
    pub fn as_imap_str(&self) -> &'static str {
        match self {
            Self::Seen => "\\Seen",
            Self::Answered => "\\Answered",
            Self::Flagged => "\\Flagged",
            Self::Deleted => "\\Deleted",
            Self::Draft => "\\Draft",
        }
    }
}

impl FromStr for Flag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim() {
            seen if seen.eq_ignore_ascii_case("seen") => Ok(Flag::Seen),
            read if read.eq_ignore_ascii_case("read") => Ok(Flag::Seen),
            answered if answered.eq_ignore_ascii_case("answered") => Ok(Flag::Answered),
            flagged if flagged.eq_ignore_ascii_case("flagged") => Ok(Flag::Flagged),
            starred if starred.eq_ignore_ascii_case("starred") => Ok(Flag::Flagged),
            deleted if deleted.eq_ignore_ascii_case("deleted") => Ok(Flag::Deleted),
            draft if draft.eq_ignore_ascii_case("draft") => Ok(Flag::Draft),
            unknown => Err(Error::ParseFlagError(unknown.to_owned())),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Seen => write!(f, "seen"),
            Self::Answered => write!(f, "answered"),
            Self::Flagged => write!(f, "flagged"),
            Self::Deleted => write!(f, "deleted"),
            Self::Draft => write!(f, "draft"),
        }
    }
}

/// The set of message flags.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Flags(pub BTreeSet<Flag>);

impl Flags {
    /// Build a flag set from the given flags.
    pub fn from_iter_owned(flags: impl IntoIterator<Item = Flag>) -> Self {
        Self(flags.into_iter().collect())
    }
}

impl Deref for Flags {
    type Target = BTreeSet<Flag>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Flags {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<Flag> for Flags {
    fn from_iter<T: IntoIterator<Item = Flag>>(iter: T) -> Self {
        Flags(iter.into_iter().collect())
    }
}

impl From<Flag> for Flags {
    fn from(flag: Flag) -> Self {
        Flags(BTreeSet::from_iter(Some(flag)))
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut glue = "";

        for flag in &self.0 {
            write!(f, "{glue}{flag}")?;
            glue = " ";
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flag_aliases() {
        assert_eq!("read".parse::<Flag>().unwrap(), Flag::Seen);
        assert_eq!("starred".parse::<Flag>().unwrap(), Flag::Flagged);
        assert_eq!("Draft".parse::<Flag>().unwrap(), Flag::Draft);
    }

    #[test]
    fn parse_unknown_flag_fails() {
        assert!("pinned".parse::<Flag>().is_err());
    }

    #[test]
    fn display_flags_space_separated() {
        let flags = Flags::from_iter([Flag::Flagged, Flag::Seen]);
        assert_eq!(flags.to_string(), "seen flagged");
    }
}
