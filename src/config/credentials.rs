use super::{Settings, PRAW_FILENAME};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal,
};
use directories::BaseDirs;
use std::{
    collections::BTreeMap,
    fs::read_to_string,
    io::{self, BufRead, IsTerminal, Write},
    iter,
    path::{Path, PathBuf},
};
use tracing::debug;

const DEFAULT_SECTION: &str = "DEFAULT";
const DEFAULT_USER_AGENT: &str = concat!("shreddit/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("no praw.ini found in {}", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("praw.ini has no [{0}] section")]
    MissingSection(String),
    #[error("no `{key}` set in praw.ini section [{section}] or the shreddit config")]
    MissingKey { section: String, key: &'static str },
    #[error("could not read the password: {0}")]
    Prompt(#[source] io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Everything needed to log in as a script app.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

/// The sections of a praw.ini file. Keys of `[DEFAULT]` apply to every section.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrawIni {
    defaults: BTreeMap<String, String>,
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl PrawIni {
    pub fn parse(content: &str) -> Self {
        let mut ini = Self::default();
        let mut current: Option<String> = None;

        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
                let name = name.trim().to_string();
                if name != DEFAULT_SECTION {
                    ini.sections.entry(name.clone()).or_default();
                }
                current = Some(name);
                continue;
            }
            let Some((key, value)) = line.split_once(['=', ':']) else {
                debug!(line, "Ignoring praw.ini line without a value");
                continue;
            };
            let (key, value) = (key.trim().to_lowercase(), value.trim().to_string());
            match current.as_deref() {
                Some(DEFAULT_SECTION) => {
                    ini.defaults.insert(key, value);
                }
                Some(section) => {
                    ini.sections.entry(section.to_string()).or_default().insert(key, value);
                }
                None => debug!(key = %key, "Ignoring praw.ini entry outside of a section"),
            }
        }
        ini
    }

    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        let content = read_to_string(path).map_err(|source| CredentialError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    /// Loads `praw.ini` from `working_dir`, or else from the user config dir.
    pub fn discover(working_dir: &Path) -> Result<Self, CredentialError> {
        let mut searched = vec![working_dir.join(PRAW_FILENAME)];
        if let Some(dirs) = BaseDirs::new() {
            searched.push(dirs.config_dir().join(PRAW_FILENAME));
        }
        match searched.iter().find(|path| path.is_file()) {
            Some(path) => {
                debug!(path = %path.display(), "Reading praw.ini");
                Self::load(path)
            }
            None => Err(CredentialError::NotFound { searched }),
        }
    }

    /// The section's keys merged over `[DEFAULT]`. Empty values count as unset.
    pub fn section(&self, name: &str) -> Option<BTreeMap<String, String>> {
        let own = if name == DEFAULT_SECTION {
            BTreeMap::new()
        } else {
            self.sections.get(name)?.clone()
        };
        let mut merged = self.defaults.clone();
        merged.extend(own);
        merged.retain(|_, value| !value.is_empty());
        Some(merged)
    }

    /// Builds credentials from `section`. Username and password from the shreddit config take
    /// precedence, and `ask_pass` reads the password through `prompt`.
    pub fn credentials<P>(
        &self,
        section: &str,
        settings: &Settings,
        prompt: P,
    ) -> Result<Credentials, CredentialError>
    where
        P: FnOnce(&str) -> io::Result<String>,
    {
        let mut values = self
            .section(section)
            .ok_or_else(|| CredentialError::MissingSection(section.to_string()))?;
        let mut require = |key: &'static str| {
            values.remove(key).ok_or_else(|| CredentialError::MissingKey {
                section: section.to_string(),
                key,
            })
        };

        let client_id = require("client_id")?;
        let client_secret = require("client_secret")?;
        let username = match &settings.username {
            Some(username) if !username.is_empty() => username.clone(),
            _ => require("username")?,
        };
        let password = if settings.ask_pass {
            prompt(&username).map_err(CredentialError::Prompt)?
        } else {
            match &settings.password {
                Some(password) if !password.is_empty() => password.clone(),
                _ => require("password")?,
            }
        };
        let user_agent = values
            .remove("user_agent")
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        Ok(Credentials {
            client_id,
            client_secret,
            username,
            password,
            user_agent,
        })
    }
}

/// Prompts on stderr and reads a password without echoing it. Piped input is read as a line.
pub fn prompt_password(username: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "Password for /u/{username}: ")?;
    stderr.flush()?;

    if !io::stdin().is_terminal() {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        return Ok(line.trim_end_matches(['\r', '\n']).to_string());
    }

    terminal::enable_raw_mode()?;
    let password = read_password(iter::repeat_with(event::read));
    terminal::disable_raw_mode()?;
    writeln!(stderr)?;
    password
}

/// Collects typed characters until Enter. Ctrl-C cancels with `ErrorKind::Interrupted`,
/// since raw mode keeps it from raising a signal.
fn read_password<I>(events: I) -> io::Result<String>
where
    I: IntoIterator<Item = io::Result<Event>>,
{
    let mut password = String::new();
    for event in events {
        let Event::Key(key) = event? else {
            continue;
        };
        if key.kind == KeyEventKind::Release {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(password),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "password entry cancelled"));
            }
            KeyCode::Backspace => {
                password.pop();
            }
            KeyCode::Char(c) => password.push(c),
            _ => {}
        }
    }
    Err(io::ErrorKind::UnexpectedEof.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;

    const INI: &str = "\
[DEFAULT]
user_agent = shreddit tests

; a comment
[default]
client_id=abc
client_secret=xyz
username=someone
password=hunter2

[alt]
client_id: alt-id
client_secret: alt-secret
username = other
password =
";

    fn no_prompt(_: &str) -> io::Result<String> {
        panic!("the password prompt should not be shown")
    }

    #[test]
    fn sections_inherit_defaults() {
        let ini = PrawIni::parse(INI);
        let section = ini.section("alt").unwrap();
        assert_eq!(section.get("client_id").map(String::as_str), Some("alt-id"));
        assert_eq!(section.get("user_agent").map(String::as_str), Some("shreddit tests"));
        assert!(!section.contains_key("password"));
        assert!(ini.section("missing").is_none());
    }

    #[test]
    fn credentials_come_from_the_section() {
        let credentials = PrawIni::parse(INI)
            .credentials("default", &Settings::default(), no_prompt)
            .unwrap();
        assert_eq!(
            credentials,
            Credentials {
                client_id: "abc".to_string(),
                client_secret: "xyz".to_string(),
                username: "someone".to_string(),
                password: "hunter2".to_string(),
                user_agent: "shreddit tests".to_string(),
            }
        );
    }

    #[test]
    fn config_login_details_take_precedence() {
        let settings = Settings {
            username: Some("configured".to_string()),
            password: Some("from-yaml".to_string()),
            ..Settings::default()
        };
        let credentials = PrawIni::parse(INI).credentials("alt", &settings, no_prompt).unwrap();
        assert_eq!(credentials.username, "configured");
        assert_eq!(credentials.password, "from-yaml");
    }

    #[test]
    fn ask_pass_prompts_even_with_a_stored_password() {
        let settings = Settings {
            ask_pass: true,
            ..Settings::default()
        };
        let credentials = PrawIni::parse(INI)
            .credentials("default", &settings, |username| Ok(format!("typed-for-{username}")))
            .unwrap();
        assert_eq!(credentials.password, "typed-for-someone");
    }

    #[test]
    fn missing_password_is_reported() {
        let err = PrawIni::parse(INI)
            .credentials("alt", &Settings::default(), no_prompt)
            .unwrap_err();
        assert!(matches!(err, CredentialError::MissingKey { key: "password", .. }));
    }

    #[test]
    fn missing_section_is_reported() {
        let err = PrawIni::parse(INI)
            .credentials("nobody", &Settings::default(), no_prompt)
            .unwrap_err();
        assert_eq!(err.to_string(), "praw.ini has no [nobody] section");
    }

    #[test]
    fn user_agent_has_a_fallback() {
        let ini =
            PrawIni::parse("[default]\nclient_id=a\nclient_secret=b\nusername=c\npassword=d\n");
        let credentials = ini.credentials("default", &Settings::default(), no_prompt).unwrap();
        assert!(credentials.user_agent.starts_with("shreddit/"));
    }

    fn keys(codes: &[KeyCode]) -> Vec<io::Result<Event>> {
        codes
            .iter()
            .map(|&code| Ok(Event::Key(KeyEvent::new(code, KeyModifiers::NONE))))
            .collect()
    }

    #[test]
    fn password_is_read_up_to_enter() {
        let mut events = keys(&[KeyCode::Char('h'), KeyCode::Char('x'), KeyCode::Backspace]);
        events.push(Ok(Event::Key(KeyEvent::new_with_kind(
            KeyCode::Char('z'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        ))));
        events.extend(keys(&[
            KeyCode::Char('i'),
            KeyCode::Tab,
            KeyCode::Enter,
            KeyCode::Char('!'),
        ]));

        assert_eq!(read_password(events).unwrap(), "hi");
    }

    #[test]
    fn ctrl_c_cancels_password_entry() {
        let mut events = keys(&[KeyCode::Char('a')]);
        events.push(Ok(Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))));

        let err = read_password(events).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
    }

    #[test]
    fn password_entry_needs_enter() {
        let err = read_password(keys(&[KeyCode::Char('a')])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
