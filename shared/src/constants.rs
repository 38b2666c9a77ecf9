//! Provider tables and fixed identifiers.

/// Identifier carried by the single terminating failure of a session.
pub const TERMINATING_ERROR_ID: &str = "1";

/// Enumerator name → ETW provider name for the .NET framework event sources.
pub const WELL_KNOWN_PROVIDERS: &[(&str, &str)] = &[
    ("AspNetEventSource", "Microsoft-Windows-ASPNET"),
    ("ConcurrentCollectionsEventSource", "System.Collections.Concurrent.ConcurrentCollectionsEventSource"),
    ("FrameworkEventSource", "System.Diagnostics.Eventing.FrameworkEventSource"),
    ("PinnableBufferCacheEventSource", "Microsoft-DotNETRuntime-PinnableBufferCache-System"),
    ("PlinqEventSource", "System.Linq.Parallel.PlinqEventSource"),
    ("SqlEventSource", "Microsoft-AdoNet-SystemData"),
    ("SynchronizationEventSource", "System.Threading.SynchronizationEventSource"),
    ("TplEventSource", "System.Threading.Tasks.TplEventSource"),
];

/// Enumerator name → ETW provider name for IIS and HTTP.sys.
pub const IIS_PROVIDERS: &[(&str, &str)] = &[
    ("AspDotNetEvents", "ASP.NET Events"),
    ("HttpEvent", "Microsoft-Windows-HttpEvent"),
    ("HttpLog", "Microsoft-Windows-HttpLog"),
    ("HttpService", "Microsoft-Windows-HttpService"),
    ("IISAppHostSvc", "Microsoft-Windows-IIS-APPHOSTSVC"),
    ("IISLogging", "Microsoft-Windows-IIS-Logging"),
    ("IISW3Svc", "Microsoft-Windows-IIS-W3SVC"),
    ("RuntimeWebApi", "Microsoft-Windows-Runtime-WebAPI"),
    ("RuntimeWebHttp", "Microsoft-Windows-Runtime-Web-Http"),
];
