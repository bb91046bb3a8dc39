//! Description of the host a wire was written on.
//!
//! [`SystemContext::capture`] samples the host once; the value is passed to
//! whoever needs it and is usually written as the first metadata document
//! of a wire so readers know where the data came from.

use crate::{
    DocumentIn, DocumentWriter, NanoTimestampConverter, Result, ValueIn, ValueOut, ValueOutExt,
};
use chrono::Utc;
use std::env;

/// Event name a system context is written under.
pub const SYSTEM_CONTEXT_EVENT: &str = "systemContext";

/// Host details captured at startup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemContext {
    pub available_processors: u32,
    pub host_id: u32,
    pub host_name: Option<String>,
    /// Capture time in nanoseconds since the Unix epoch.
    pub up_time: i64,
    pub user_country: Option<String>,
    pub user_name: Option<String>,
    pub library_version: String,
}

impl SystemContext {
    /// Samples the current process and host.
    ///
    /// `HOST_ID` is read from the environment and defaults to 0.
    #[must_use]
    pub fn capture() -> Self {
        SystemContext {
            available_processors: std::thread::available_parallelism()
                .map_or(1, |n| n.get() as u32),
            host_id: env::var("HOST_ID")
                .ok()
                .and_then(|id| id.parse().ok())
                .unwrap_or(0),
            host_name: env_any(&["HOSTNAME", "COMPUTERNAME"]),
            up_time: Utc::now().timestamp_nanos_opt().unwrap_or(0),
            user_country: env_any(&["LC_ALL", "LANG"]).and_then(|locale| country_of(&locale)),
            user_name: env_any(&["USER", "USERNAME"]),
            library_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Writes the context as an object; the capture time is a timestamp on
    /// textual wires.
    pub fn write_marshallable(&self, out: &mut dyn ValueOut) -> Result<()> {
        out.object(|out| {
            out.field("availableProcessors")?;
            out.uint32(self.available_processors)?;
            out.field("hostId")?;
            out.uint32(self.host_id)?;
            out.field("hostName")?;
            write_opt(out, self.host_name.as_deref())?;
            out.field("upTime")?;
            out.write_long(&NanoTimestampConverter, self.up_time)?;
            out.field("userCountry")?;
            write_opt(out, self.user_country.as_deref())?;
            out.field("userName")?;
            write_opt(out, self.user_name.as_deref())?;
            out.field("libraryVersion")?;
            out.text(&self.library_version)
        })
    }

    /// Reads a context written by [`write_marshallable`](Self::write_marshallable).
    ///
    /// Fields it does not know are ignored.
    pub fn read_marshallable(input: &ValueIn) -> Result<Self> {
        let mut context = SystemContext::default();
        for (name, value) in input.fields()? {
            match name.as_str() {
                "availableProcessors" => context.available_processors = value.uint32()?,
                "hostId" => context.host_id = value.uint32()?,
                "hostName" => context.host_name = value.opt_text()?,
                "upTime" => context.up_time = value.read_long(&NanoTimestampConverter)?,
                "userCountry" => context.user_country = value.opt_text()?,
                "userName" => context.user_name = value.opt_text()?,
                "libraryVersion" => context.library_version = value.text()?,
                _ => {}
            }
        }
        Ok(context)
    }

    /// Writes the context as a metadata document.
    pub fn write_to<W: DocumentWriter + ?Sized>(&self, writer: &W) -> Result<()> {
        writer.write_document(true, |out| {
            out.event(SYSTEM_CONTEXT_EVENT)?;
            self.write_marshallable(out)
        })
    }

    /// Finds a context in `doc`, if one was written there.
    pub fn from_document(doc: &DocumentIn) -> Result<Option<Self>> {
        doc.events()
            .iter()
            .find(|(key, _)| key.as_ref().map_or(false, |k| k.is(SYSTEM_CONTEXT_EVENT)))
            .map(|(_, value)| Self::read_marshallable(&ValueIn::new(value.clone())))
            .transpose()
    }
}

fn write_opt(out: &mut dyn ValueOut, text: Option<&str>) -> Result<()> {
    match text {
        Some(text) => out.text(text),
        None => out.null(),
    }
}

fn env_any(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.is_empty())
}

/// `en_GB.UTF-8` is `GB`.
fn country_of(locale: &str) -> Option<String> {
    let locale = locale.split(['.', '@']).next()?;
    let (_, country) = locale.split_once('_')?;
    (country.len() == 2 && country.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| country.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Wire, WireOptions};

    fn sample() -> SystemContext {
        SystemContext {
            available_processors: 8,
            host_id: 3,
            host_name: Some("trading-1".to_string()),
            up_time: 1_700_000_000_123_456_789,
            user_country: Some("GB".to_string()),
            user_name: None,
            library_version: "0.1.0".to_string(),
        }
    }

    #[test]
    fn test_country_of() {
        assert_eq!(country_of("en_GB.UTF-8").as_deref(), Some("GB"));
        assert_eq!(country_of("de_de@euro").as_deref(), Some("DE"));
        assert_eq!(country_of("C"), None);
        assert_eq!(country_of("POSIX.UTF-8"), None);
    }

    #[test]
    fn test_capture() {
        let context = SystemContext::capture();
        assert!(context.available_processors >= 1);
        assert!(context.up_time > 0);
        assert_eq!(context.library_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_metadata_document_round_trip() {
        for options in [WireOptions::text(), WireOptions::yaml(), WireOptions::binary(), WireOptions::json()] {
            let wire = Wire::new(options);
            sample().write_to(&wire).unwrap();
            let doc = wire.reading_document().unwrap().unwrap();
            assert!(doc.is_meta_data());
            assert_eq!(SystemContext::from_document(&doc).unwrap(), Some(sample()));
        }
    }

    #[test]
    fn test_up_time_is_a_timestamp_on_text() {
        let wire = Wire::new(WireOptions::text());
        sample().write_to(&wire).unwrap();
        let body = String::from_utf8(wire.bytes().unwrap()[4..].to_vec()).unwrap();
        assert!(body.contains("upTime: \"2023-11-14T22:13:20.123456789Z\""), "{}", body);
    }
}
