//! Hint-driven resolution.

use std::net::SocketAddr;
use std::sync::Arc;

use super::{Hints, NameService, ResolveError, Solution, SolutionTable, SystemNameService};
use crate::addr::{local_literal, Address, LocalFamilies};
use crate::config::ResolverConfig;
use crate::observability::metrics;
use crate::protocol::{Family, SocketType};

/// One candidate: `(matched family, address, solution family, type, protocol)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub family: Family,
    pub address: Address,
    pub solution: Solution,
}

/// Resolves hostnames against a fixed solution table.
#[derive(Clone)]
pub struct Resolver {
    table: SolutionTable,
    service: Arc<dyn NameService>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").field("table", &self.table).finish_non_exhaustive()
    }
}

impl Resolver {
    /// Resolver backed by the operating system.
    pub fn new(config: &ResolverConfig) -> Self {
        Self::with_service(config, Arc::new(SystemNameService))
    }

    /// Resolver backed by a custom name service.
    pub fn with_service(config: &ResolverConfig, service: Arc<dyn NameService>) -> Self {
        Self {
            table: SolutionTable::new(config.prefer_ipv4),
            service,
        }
    }

    pub fn table(&self) -> &SolutionTable {
        &self.table
    }

    /// Resolve `host` (or a local literal when absent) into candidates.
    ///
    /// Results come in lookup order, and for each address in solution-table
    /// order. Callers taking the first result rely on this.
    pub fn resolve(
        &self,
        host: Option<&str>,
        port: u16,
        hints: &Hints,
    ) -> Result<Vec<Resolved>, ResolveError> {
        let result = self.resolve_inner(host, port, hints);
        match &result {
            Ok(found) => {
                metrics::record_resolution(metrics::OK);
                tracing::debug!(
                    host = host.unwrap_or("<local>"),
                    port,
                    family = %hints.family,
                    count = found.len(),
                    "Resolved"
                );
            }
            Err(e) => {
                metrics::record_resolution(metrics::ERROR);
                tracing::debug!(host = host.unwrap_or("<local>"), error = %e, "Resolution failed");
            }
        }
        result
    }

    /// [`Resolver::resolve`] on tokio's blocking pool.
    pub async fn resolve_async(
        &self,
        host: Option<String>,
        port: u16,
        hints: Hints,
    ) -> Result<Vec<Resolved>, ResolveError> {
        let resolver = self.clone();
        tokio::task::spawn_blocking(move || resolver.resolve(host.as_deref(), port, &hints))
            .await
            .map_err(|e| ResolveError::Lookup(e.to_string()))?
    }

    fn resolve_inner(
        &self,
        host: Option<&str>,
        port: u16,
        hints: &Hints,
    ) -> Result<Vec<Resolved>, ResolveError> {
        validate(port, hints)?;

        let local = if hints.respects_interfaces() {
            self.service.local_families().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Interface scan failed, treating both families as absent");
                LocalFamilies::NONE
            })
        } else {
            LocalFamilies::ALL
        };

        let names = self.candidate_names(host, hints, local);
        let mut native = Vec::new();
        for name in &names {
            let found = self
                .service
                .lookup(name)
                .map_err(|e| ResolveError::Lookup(e.to_string()))?;
            native.extend(found);
        }

        // Literal hosts carry no name worth persisting.
        let hostname = host.filter(|h| Address::from_presentation(h, 0).is_err());
        Ok(self.expand(native, port, hostname, hints, local))
    }

    fn candidate_names(&self, host: Option<&str>, hints: &Hints, local: LocalFamilies) -> Vec<String> {
        if let Some(host) = host {
            return vec![host.to_string()];
        }

        let passive = hints.is_passive();
        let families: Vec<Family> = if hints.family.is_unspec() {
            self.table
                .families()
                .into_iter()
                .filter(|f| supported(local, *f))
                .collect()
        } else {
            vec![hints.family]
        };

        families
            .into_iter()
            .filter_map(|f| local_literal(f, passive))
            .map(String::from)
            .collect()
    }

    fn expand(
        &self,
        native: Vec<SocketAddr>,
        port: u16,
        hostname: Option<&str>,
        hints: &Hints,
        local: LocalFamilies,
    ) -> Vec<Resolved> {
        let mut out = Vec::new();
        for addr in native {
            let family = Family::of(&addr);
            if !hints.family.is_unspec() && hints.family != family {
                continue;
            }
            if !supported(local, family) {
                continue;
            }

            let mut address = Address::from_native(addr).with_port(port);
            if let Some(name) = hostname {
                address = address.with_hostname(name);
            }

            for solution in self
                .table
                .find_all(hints.family, hints.socket_type, hints.protocol)
                .filter(|s| s.family == family)
            {
                out.push(Resolved {
                    family,
                    address: address.clone(),
                    solution: *solution,
                });
            }
        }
        out
    }
}

fn supported(local: LocalFamilies, family: Family) -> bool {
    match family {
        Family::Inet => local.inet,
        Family::Inet6 => local.inet6,
        Family::Unspec | Family::Unix => false,
    }
}

fn validate(port: u16, hints: &Hints) -> Result<(), ResolveError> {
    if !matches!(hints.family, Family::Unspec | Family::Inet | Family::Inet6) {
        return Err(ResolveError::Validation(
            "resolve socket family must be PF_UNSPEC, PF_INET, or PF_INET6".into(),
        ));
    }
    if !matches!(
        hints.socket_type,
        SocketType::Any | SocketType::Dgram | SocketType::Stream | SocketType::Raw
    ) {
        return Err(ResolveError::Validation(
            "resolve socket type must be SOCK_ANY, SOCK_DGRAM, SOCK_STREAM, or SOCK_RAW".into(),
        ));
    }
    if hints.socket_type == SocketType::Raw && port != 0 {
        return Err(ResolveError::Validation(
            "resolve cannot accept a port when resolving addresses for raw sockets".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;
    use crate::resolve::ResolveFlags;
    use std::collections::HashMap;
    use std::io;
    use std::sync::Mutex;

    struct StubService {
        answers: HashMap<&'static str, Vec<SocketAddr>>,
        local: io::Result<LocalFamilies>,
        asked: Mutex<Vec<String>>,
    }

    impl StubService {
        fn new(local: LocalFamilies) -> Self {
            let mut answers = HashMap::new();
            answers.insert("0.0.0.0", vec!["0.0.0.0:0".parse().unwrap()]);
            answers.insert("127.0.0.1", vec!["127.0.0.1:0".parse().unwrap()]);
            answers.insert("::", vec!["[::]:0".parse().unwrap()]);
            answers.insert("::1", vec!["[::1]:0".parse().unwrap()]);
            answers.insert(
                "dual.test",
                vec!["192.0.2.1:0".parse().unwrap(), "[2001:db8::1]:0".parse().unwrap()],
            );
            Self {
                answers,
                local: Ok(local),
                asked: Mutex::new(Vec::new()),
            }
        }

        fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    impl NameService for StubService {
        fn lookup(&self, host: &str) -> io::Result<Vec<SocketAddr>> {
            self.asked.lock().unwrap().push(host.to_string());
            self.answers
                .get(host)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such host"))
        }

        fn local_families(&self) -> io::Result<LocalFamilies> {
            match &self.local {
                Ok(local) => Ok(*local),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            }
        }
    }

    fn resolver(prefer_ipv4: bool, service: Arc<StubService>) -> Resolver {
        Resolver::with_service(&ResolverConfig { prefer_ipv4 }, service)
    }

    #[test]
    fn results_follow_lookup_then_table_order() {
        let service = Arc::new(StubService::new(LocalFamilies::ALL));
        let found = resolver(false, service)
            .resolve(Some("dual.test"), 80, &Hints::default())
            .unwrap();

        let shape: Vec<_> = found
            .iter()
            .map(|r| (r.address.to_string(), r.solution.socket_type))
            .collect();
        assert_eq!(
            shape,
            [
                ("192.0.2.1".to_string(), SocketType::Dgram),
                ("192.0.2.1".to_string(), SocketType::Stream),
                ("2001:db8::1".to_string(), SocketType::Dgram),
                ("2001:db8::1".to_string(), SocketType::Stream),
            ]
        );
        assert!(found.iter().all(|r| r.address.port() == 80));
        assert!(found.iter().all(|r| r.address.hostname() == Some("dual.test")));
        assert!(found.iter().all(|r| r.family == r.solution.family));
    }

    #[test]
    fn family_hint_filters_addresses() {
        let service = Arc::new(StubService::new(LocalFamilies::ALL));
        let hints = Hints::default()
            .family(Family::Inet6)
            .socket_type(SocketType::Stream);
        let found = resolver(true, service).resolve(Some("dual.test"), 443, &hints).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].address.family(), Family::Inet6);
        assert_eq!(found[0].solution.protocol, Protocol::Tcp);
    }

    #[test]
    fn missing_host_uses_local_literals() {
        let service = Arc::new(StubService::new(LocalFamilies::ALL));
        let hints = Hints::default().flags(ResolveFlags::PASSIVE);
        let found = resolver(false, service.clone()).resolve(None, 0, &hints).unwrap();
        assert_eq!(service.asked(), ["::", "0.0.0.0"]);
        assert!(found.iter().all(|r| r.address.ip().is_unspecified()));
        assert!(found.iter().all(|r| r.address.hostname().is_none()));

        let service = Arc::new(StubService::new(LocalFamilies::ALL));
        let hints = Hints::default().family(Family::Inet);
        resolver(false, service.clone()).resolve(None, 0, &hints).unwrap();
        assert_eq!(service.asked(), ["127.0.0.1"]);
    }

    #[test]
    fn preference_orders_missing_host_literals() {
        let service = Arc::new(StubService::new(LocalFamilies::ALL));
        let found = resolver(true, service.clone())
            .resolve(None, 0, &Hints::default())
            .unwrap();
        assert_eq!(service.asked(), ["127.0.0.1", "::1"]);
        assert_eq!(found[0].family, Family::Inet);
        assert_eq!(found.last().unwrap().family, Family::Inet6);
    }

    #[test]
    fn addrconfig_drops_unconfigured_families() {
        let v4_only = LocalFamilies { inet: true, inet6: false };
        let service = Arc::new(StubService::new(v4_only));
        let hints = Hints::default().flags(ResolveFlags::ADDRCONFIG | ResolveFlags::PASSIVE);

        let found = resolver(false, service.clone()).resolve(None, 0, &hints).unwrap();
        // IPv6 is preferred but absent, so IPv4 is the fallback.
        assert_eq!(service.asked(), ["0.0.0.0"]);
        assert!(found.iter().all(|r| r.family == Family::Inet));

        let found = resolver(false, service)
            .resolve(Some("dual.test"), 0, &hints)
            .unwrap();
        assert!(found.iter().all(|r| r.family == Family::Inet));
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn without_addrconfig_interfaces_are_not_consulted() {
        let mut stub = StubService::new(LocalFamilies::NONE);
        stub.local = Err(io::Error::new(io::ErrorKind::Other, "boom"));
        let found = resolver(false, Arc::new(stub))
            .resolve(Some("dual.test"), 0, &Hints::default())
            .unwrap();
        assert_eq!(found.len(), 4);
    }

    #[test]
    fn failed_interface_scan_means_no_families() {
        let mut stub = StubService::new(LocalFamilies::ALL);
        stub.local = Err(io::Error::new(io::ErrorKind::Other, "boom"));
        let hints = Hints::default().flags(ResolveFlags::ADDRCONFIG);
        let found = resolver(false, Arc::new(stub))
            .resolve(Some("dual.test"), 0, &hints)
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn raw_sockets_take_no_port() {
        let service = Arc::new(StubService::new(LocalFamilies::ALL));
        let resolver = resolver(false, service);
        let hints = Hints::default().socket_type(SocketType::Raw);

        let found = resolver.resolve(None, 0, &hints).unwrap();
        assert!(!found.is_empty());
        assert!(found.iter().all(|r| r.solution.socket_type == SocketType::Raw));

        let err = resolver.resolve(None, 80, &hints).unwrap_err();
        assert!(matches!(err, ResolveError::Validation(_)));
    }

    #[test]
    fn unsupported_hints_are_rejected() {
        let service = Arc::new(StubService::new(LocalFamilies::ALL));
        let resolver = resolver(false, service.clone());

        let err = resolver
            .resolve(None, 0, &Hints::default().family(Family::Unix))
            .unwrap_err();
        assert!(matches!(err, ResolveError::Validation(_)));

        let err = resolver
            .resolve(None, 0, &Hints::default().socket_type(SocketType::SeqPacket))
            .unwrap_err();
        assert!(matches!(err, ResolveError::Validation(_)));
        assert!(service.asked().is_empty());
    }

    #[test]
    fn lookup_failures_surface() {
        let service = Arc::new(StubService::new(LocalFamilies::ALL));
        let err = resolver(false, service)
            .resolve(Some("missing.test"), 0, &Hints::default())
            .unwrap_err();
        assert!(matches!(err, ResolveError::Lookup(_)));
        assert!(err.to_string().starts_with("Error resolving hostname: "));
    }

    #[tokio::test]
    async fn async_resolution_matches_blocking() {
        let service = Arc::new(StubService::new(LocalFamilies::ALL));
        let resolver = resolver(false, service);
        let blocking = resolver.resolve(Some("dual.test"), 8, &Hints::default()).unwrap();
        let async_found = resolver
            .resolve_async(Some("dual.test".into()), 8, Hints::default())
            .await
            .unwrap();
        assert_eq!(blocking, async_found);
    }
}
