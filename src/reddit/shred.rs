use super::{Data, Item, Kind, Page, RedditApi, RedditClient};
use crate::{CredentialError, ItemSelection, PrawIni, Replacement, Settings, Sort};
use chrono::{DateTime, Duration, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    io::ErrorKind,
    thread::sleep,
    time::Duration as StdDuration,
};
use tracing::{debug, info, warn};

/// Reddit never lists more than this many entries of a user's history.
pub const LISTING_CAP: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ShredError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error("could not log in as /u/{username}: {message}")]
    Login { username: String, message: String },
    #[error("reddit request failed: {0}")]
    Api(String),
    #[error("could not save a copy of {id} to {path}: {source}")]
    Save {
        id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("interrupted by user")]
    Aborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Remove(RemoveReason),
    Keep(KeepReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveReason {
    Blacklisted,
    Nuked,
    Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeepReason {
    Whitelisted,
    TooRecent,
}

fn lowercase(names: &[String]) -> HashSet<String> {
    names.iter().map(|name| name.to_lowercase()).collect()
}

/// `now` minus `hours`, or `None` when that lies before the earliest representable time.
fn hours_before(now: DateTime<Utc>, hours: u64) -> Option<DateTime<Utc>> {
    i64::try_from(hours)
        .ok()
        .and_then(Duration::try_hours)
        .and_then(|age| now.checked_sub_signed(age))
}

/// The retention rules of a [`Settings`], fixed at a point in time.
#[derive(Clone, Debug)]
pub struct Rules {
    /// `None` keeps every item as too recent.
    recent_cutoff: Option<DateTime<Utc>>,
    nuke_cutoff: Option<DateTime<Utc>>,
    max_score: Option<i64>,
    whitelist: HashSet<String>,
    whitelist_ids: HashSet<String>,
    blacklist: HashSet<String>,
    whitelist_distinguished: bool,
    whitelist_gilded: bool,
}

impl Rules {
    pub fn new(settings: &Settings, now: DateTime<Utc>) -> Self {
        Self {
            recent_cutoff: hours_before(now, settings.hours),
            nuke_cutoff: settings.nuke_hours.and_then(|hours| hours_before(now, hours)),
            max_score: settings.max_score,
            whitelist: lowercase(&settings.whitelist),
            whitelist_ids: settings.whitelist_ids.iter().cloned().collect(),
            blacklist: lowercase(&settings.blacklist),
            whitelist_distinguished: settings.whitelist_distinguished,
            whitelist_gilded: settings.whitelist_gilded,
        }
    }

    fn is_whitelisted(&self, item: &Item) -> bool {
        self.whitelist.contains(&item.subreddit.to_lowercase())
            || self.whitelist_ids.contains(&item.id)
            || (self.whitelist_distinguished && item.distinguished)
            || (self.whitelist_gilded && item.gilded)
            || self.max_score.is_some_and(|max| item.score > max)
    }

    /// Blacklist and nuke cutoff win over the whitelist, which wins over age.
    pub fn verdict(&self, item: &Item) -> Verdict {
        if self.blacklist.contains(&item.subreddit.to_lowercase()) {
            Verdict::Remove(RemoveReason::Blacklisted)
        } else if self.nuke_cutoff.is_some_and(|cutoff| item.created <= cutoff) {
            Verdict::Remove(RemoveReason::Nuked)
        } else if self.is_whitelisted(item) {
            Verdict::Keep(KeepReason::Whitelisted)
        } else if !self.recent_cutoff.is_some_and(|cutoff| item.created <= cutoff) {
            Verdict::Keep(KeepReason::TooRecent)
        } else {
            Verdict::Remove(RemoveReason::Expired)
        }
    }
}

const LOREM: [&str; 24] = [
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "minim", "veniam", "quis", "nostrud",
];

impl Replacement {
    /// The text an item is overwritten with before it is deleted.
    pub fn text(&self) -> String {
        match self {
            Self::Random => {
                let words: Vec<&str> = (0..fastrand::usize(8..24))
                    .map(|_| LOREM[fastrand::usize(..LOREM.len())])
                    .collect();
                let mut sentence = words.join(" ");
                if let Some(first) = sentence.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                sentence.push('.');
                sentence
            }
            Self::Dot => ".".to_string(),
            Self::Literal(text) => text.clone(),
        }
    }
}

/// Removes a user's history according to their [`Settings`].
pub struct Shredder<C> {
    settings: Settings,
    username: String,
    client: C,
    interrupted: Arc<AtomicBool>,
}

impl Shredder<RedditApi> {
    /// Logs in with the credentials of `user_section` in praw.ini.
    pub fn connect(
        settings: Settings,
        user_section: &str,
        working_dir: &Path,
        interrupted: Arc<AtomicBool>,
    ) -> Result<Self, ShredError> {
        let praw = PrawIni::discover(working_dir)?;
        let credentials = praw
            .credentials(user_section, &settings, crate::prompt_password)
            .map_err(|err| match err {
                CredentialError::Prompt(err) if err.kind() == ErrorKind::Interrupted => {
                    ShredError::Aborted
                }
                err => err.into(),
            })?;
        let client = RedditApi::login(&credentials)?;
        info!(username = %credentials.username, "Logged in");
        Ok(Self::with_client(settings, credentials.username, client, interrupted))
    }
}

impl<C: RedditClient> Shredder<C> {
    pub fn with_client(
        settings: Settings,
        username: String,
        client: C,
        interrupted: Arc<AtomicBool>,
    ) -> Self {
        Self {
            settings,
            username,
            client,
            interrupted,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Runs batches until one removes less than a full listing.
    /// Returns the number of removed items.
    pub fn shred(&mut self) -> Result<usize, ShredError> {
        let mut total = 0;
        loop {
            let removed = self.shred_batch()?;
            total += removed;
            if removed < LISTING_CAP || self.settings.trial_run {
                break;
            }
            info!(
                "Removed {removed} items, waiting {}s before the next batch",
                self.settings.batch_cooldown
            );
            self.cool_down()?;
        }
        info!("Finished removing {total} items");
        Ok(total)
    }

    fn check_interrupted(&self) -> Result<(), ShredError> {
        if self.interrupted.load(Ordering::SeqCst) {
            Err(ShredError::Aborted)
        } else {
            Ok(())
        }
    }

    fn cool_down(&self) -> Result<(), ShredError> {
        for _ in 0..self.settings.batch_cooldown.saturating_mul(10) {
            self.check_interrupted()?;
            sleep(StdDuration::from_millis(100));
        }
        self.check_interrupted()
    }

    fn collect(&self) -> Result<Vec<Item>, ShredError> {
        let kinds: &[Kind] = match self.settings.item {
            ItemSelection::Comments => &[Kind::Comment],
            ItemSelection::Submitted => &[Kind::Submission],
            ItemSelection::Overview => &[Kind::Submission, Kind::Comment],
        };

        let mut items = vec![];
        for &kind in kinds {
            let mut fetched = 0;
            let mut after: Option<String> = None;
            loop {
                self.check_interrupted()?;
                let Page {
                    items: page,
                    after: next,
                } = self.client.history(kind, after.as_deref())?;
                fetched += page.len();
                items.extend(page);
                match next {
                    Some(next) if fetched < LISTING_CAP => after = Some(next),
                    _ => break,
                }
            }
            debug!(?kind, fetched, "Loaded history");
        }

        match self.settings.sort {
            Sort::New => items.sort_by(|a, b| b.created.cmp(&a.created)),
            Sort::Top => items.sort_by(|a, b| b.score.cmp(&a.score)),
            Sort::Controversial => items.sort_by(|a, b| a.score.cmp(&b.score)),
            Sort::Hot => debug!("Keeping the listing order for hot"),
        }
        Ok(items)
    }

    fn shred_batch(&mut self) -> Result<usize, ShredError> {
        info!("Loading items to delete...");
        let items = self.collect()?;
        info!("Starting on batch of {} items...", items.len());

        let rules = Rules::new(&self.settings, Utc::now());
        let bar = ProgressBar::new(items.len() as u64);
        if let Ok(style) = ProgressStyle::with_template(
            " [{elapsed_precise}] {prefix:<10} {bar:30.cyan/red} {pos}/{len} {msg} {spinner}",
        ) {
            bar.set_style(style);
        }
        bar.set_prefix("Shredding");

        let mut removed = 0;
        for item in &items {
            self.check_interrupted()?;
            match rules.verdict(item) {
                Verdict::Remove(reason) => {
                    debug!(id = %item.id, subreddit = %item.subreddit, ?reason, "Removing");
                    bar.set_message(format!("r/{} {}", item.subreddit, item.id));
                    self.remove(item)?;
                    removed += 1;
                }
                Verdict::Keep(reason) => {
                    debug!(id = %item.id, subreddit = %item.subreddit, ?reason, "Skipping");
                }
            }
            bar.inc(1);
        }
        bar.finish_and_clear();
        Ok(removed)
    }

    fn remove(&self, item: &Item) -> Result<(), ShredError> {
        if self.settings.keep_a_copy {
            match &self.settings.save_directory {
                Some(directory) => self.save_copy(directory, item)?,
                None => {
                    warn!(id = %item.id, "keep_a_copy is set without a save_directory, not saving")
                }
            }
        }

        if self.settings.trial_run {
            info!(
                id = %item.id,
                subreddit = %item.subreddit,
                "Would have removed {}",
                item.permalink
            );
            return Ok(());
        }

        if item.is_editable() {
            let text = self.settings.replacement_format.text();
            self.client.edit(item, &text)?;
        }
        if !self.settings.edit_only {
            self.client.delete(item)?;
        }
        Ok(())
    }

    fn save_copy(&self, directory: &Path, item: &Item) -> Result<(), ShredError> {
        let path = directory.join(&self.username).join(format!("{}.json", item.id));
        debug!(path = %path.display(), "Saving a copy");
        item.save(&path).map_err(|source| ShredError::Save {
            id: item.id.clone(),
            path,
            source,
        })
    }
}
