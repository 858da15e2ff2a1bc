mod client;
pub use client::*;

mod shred;
pub use shred::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs::{create_dir_all, File},
    io::{self, BufWriter, Write},
    path::Path,
};

pub trait Data {
    fn save(&self, file: &Path) -> io::Result<()>;
}

/// Whether an item is a comment or a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Comment,
    Submission,
}

impl Kind {
    /// The prefix Reddit puts in front of ids to build fullnames.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Comment => "t1",
            Self::Submission => "t3",
        }
    }
}

/// A single entry of a user's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// The base36 id, such as "k2x1c4".
    pub id: String,
    /// The fullname used by the API, such as "t1_k2x1c4".
    pub name: String,
    pub kind: Kind,
    /// The subreddit's name without the "r/" prefix.
    pub subreddit: String,
    /// The title, for submissions.
    pub title: Option<String>,
    /// The text of a comment or self post. Empty for link posts.
    pub body: String,
    /// The score (upvotes - downvotes) the item has received.
    pub score: i64,
    pub created: DateTime<Utc>,
    /// Has the item received any Reddit awards?
    pub gilded: bool,
    /// Was the item distinguished by a moderator or admin?
    pub distinguished: bool,
    /// Is this a text post? Always false for comments.
    pub is_self: bool,
    pub permalink: String,
}

impl Item {
    /// Comments and self posts carry text that can be overwritten before deletion.
    pub fn is_editable(&self) -> bool {
        matches!(self.kind, Kind::Comment) || self.is_self
    }
}

impl Data for Item {
    fn save(&self, file: &Path) -> io::Result<()> {
        if let Some(parent) = file.parent() {
            create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(file)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()
    }
}
