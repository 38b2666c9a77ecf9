//! Descriptor resolution: turns what the user asked for (a provider name or
//! GUID, or a well-known / IIS enumerator) into a live `EventSource`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use shared::constants::{IIS_PROVIDERS, WELL_KNOWN_PROVIDERS};
use thiserror::Error;

use super::EventSource;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("unknown well-known event source '{0}'")]
    UnknownWellKnown(String),

    #[error("unknown IIS event source '{0}'")]
    UnknownIis(String),
}

/// Opens live subscriptions to the tracing subsystem, one provider at a time.
pub trait ProviderRegistry: Send + Sync {
    /// `name_or_guid` is matched case-insensitively. Repeated calls for
    /// different providers must not share events.
    fn open(&self, name_or_guid: &str) -> Result<Arc<dyn EventSource>, ResolutionError>;
}

/// One requested provider, resolved once when the session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    NameOrGuid(String),
    WellKnown(String),
    Iis(String),
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::NameOrGuid(n) => write!(f, "{n}"),
            SourceDescriptor::WellKnown(n) => write!(f, "well-known:{n}"),
            SourceDescriptor::Iis(n) => write!(f, "iis:{n}"),
        }
    }
}

macro_rules! provider_enum {
    ($(#[$meta:meta])* $name:ident, $table:expr, $err:path, [$($variant:ident),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }

            /// ETW provider name this enumerator stands for.
            pub fn provider_name(self) -> &'static str {
                let key = self.as_str();
                $table
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| *v)
                    .unwrap_or(key)
            }
        }

        impl FromStr for $name {
            type Err = ResolutionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| $err(s.into()))
            }
        }
    };
}

provider_enum!(
    /// .NET framework event sources addressable by enumerator name.
    WellKnownSource,
    WELL_KNOWN_PROVIDERS,
    ResolutionError::UnknownWellKnown,
    [
        AspNetEventSource,
        ConcurrentCollectionsEventSource,
        FrameworkEventSource,
        PinnableBufferCacheEventSource,
        PlinqEventSource,
        SqlEventSource,
        SynchronizationEventSource,
        TplEventSource,
    ]
);

provider_enum!(
    /// IIS / HTTP.sys providers addressable by enumerator name.
    IisSource,
    IIS_PROVIDERS,
    ResolutionError::UnknownIis,
    [
        AspDotNetEvents,
        HttpEvent,
        HttpLog,
        HttpService,
        IISAppHostSvc,
        IISLogging,
        IISW3Svc,
        RuntimeWebApi,
        RuntimeWebHttp,
    ]
);

/// Resolve one descriptor against `registry`.
///
/// Whether an error here fails the session or is replaced by an empty source
/// is the caller's policy (see `SessionOptions::strict_descriptors`).
pub fn resolve(
    descriptor: &SourceDescriptor,
    registry: &dyn ProviderRegistry,
) -> Result<Arc<dyn EventSource>, ResolutionError> {
    let provider = match descriptor {
        SourceDescriptor::NameOrGuid(name) => name.as_str(),
        SourceDescriptor::WellKnown(name) => name.parse::<WellKnownSource>()?.provider_name(),
        SourceDescriptor::Iis(name) => name.parse::<IisSource>()?.provider_name(),
    };
    registry.open(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ProviderHub;

    #[test]
    fn enumerators_cover_provider_tables() {
        assert_eq!(WellKnownSource::ALL.len(), WELL_KNOWN_PROVIDERS.len());
        assert_eq!(IisSource::ALL.len(), IIS_PROVIDERS.len());
        for v in WellKnownSource::ALL {
            assert_ne!(v.provider_name(), v.as_str(), "{v:?} missing from table");
        }
        for v in IisSource::ALL {
            assert_ne!(v.provider_name(), v.as_str(), "{v:?} missing from table");
        }
    }

    #[test]
    fn enumerator_names_parse_case_insensitively() {
        assert_eq!("tplEVENTsource".parse::<WellKnownSource>(), Ok(WellKnownSource::TplEventSource));
        assert_eq!("HttpLog".parse::<IisSource>(), Ok(IisSource::HttpLog));
        assert_eq!(
            "NoSuchSource".parse::<IisSource>(),
            Err(ResolutionError::UnknownIis("NoSuchSource".into()))
        );
    }

    #[test]
    fn resolve_maps_well_known_to_provider_name() {
        let hub = ProviderHub::with_known(["System.Threading.Tasks.TplEventSource"]);
        assert!(resolve(&SourceDescriptor::WellKnown("TplEventSource".into()), &hub).is_ok());
        assert!(matches!(
            resolve(&SourceDescriptor::WellKnown("PlinqEventSource".into()), &hub),
            Err(ResolutionError::UnknownProvider(_))
        ));
        assert!(matches!(
            resolve(&SourceDescriptor::Iis("Bogus".into()), &hub),
            Err(ResolutionError::UnknownIis(_))
        ));
    }
}
