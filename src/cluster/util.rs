use std::net::{IpAddr, SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;

const PROBE_TIMEOUT: Duration = Duration::from_millis(10);

/// Returns the IP addresses of every network interface on this host.
pub fn host_ip_addresses() -> Vec<IpAddr> {
    let mut addresses = vec![];

    if let Ok(interfaces) = get_if_addrs::get_if_addrs() {
        for interface in interfaces {
            addresses.push(interface.ip());
        }
    }

    addresses
}

/// Keeps only private IPv4 addresses that peers on the same segment can
/// reach.
pub fn local_network_ip_addresses(addresses: Vec<IpAddr>) -> Vec<IpAddr> {
    addresses
        .into_iter()
        .filter(|address| {
            !address.is_loopback()
                && !address.is_unspecified()
                && !address.is_multicast()
                && match address {
                    IpAddr::V4(address) => address.is_private(),
                    IpAddr::V6(_) => false,
                }
        })
        .collect()
}

/// Expands an address to its /24 neighborhood.
fn neighborhood(address: IpAddr) -> Vec<IpAddr> {
    let address = match address {
        IpAddr::V4(address) => address,
        IpAddr::V6(_) => return vec![],
    };
    let [a, b, c, _] = address.octets();
    let first = format!("{}.{}.{}.0", a, b, c);
    let last = format!("{}.{}.{}.255", a, b, c);
    match (first.parse(), last.parse()) {
        (Ok(first), Ok(last)) => ipnet::Ipv4AddrRange::new(first, last)
            .into_iter()
            .map(IpAddr::V4)
            .collect(),
        _ => vec![],
    }
}

/// TCP-probes `ports` across the /24 neighborhoods of `addresses` and
/// returns the endpoints that accepted a connection.
pub fn scan_ip_range(addresses: Vec<IpAddr>, ports: Vec<u16>) -> Vec<String> {
    let thread_pool = match rayon::ThreadPoolBuilder::new()
        .thread_name(|_| "peer scan".to_string())
        .build()
    {
        Ok(pool) => pool,
        Err(err) => {
            log::warn!("could not build scan pool: {}", err);
            return vec![];
        }
    };

    let (sender, receiver) = unbounded::<Option<String>>();
    let candidates: Vec<IpAddr> = addresses.into_iter().flat_map(neighborhood).collect();

    let _ = thread::spawn(move || {
        thread_pool.scope(|scope| {
            for address in candidates {
                let sender = sender.clone();
                let ports = ports.clone();
                scope.spawn(move |_| {
                    for port in ports {
                        let socket_addr = SocketAddr::new(address, port);
                        let probe = TcpStream::connect_timeout(&socket_addr, PROBE_TIMEOUT)
                            .ok()
                            .map(|_| socket_addr.to_string());
                        let _ = sender.send(probe);
                    }
                });
            }
        });
    });

    receiver.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_out_non_routable_addresses() {
        let addresses = vec![
            "127.0.0.1".parse().unwrap(),
            "0.0.0.0".parse().unwrap(),
            "224.0.0.1".parse().unwrap(),
            "8.8.8.8".parse().unwrap(),
            "192.168.1.20".parse().unwrap(),
            "::1".parse().unwrap(),
        ];
        assert_eq!(
            local_network_ip_addresses(addresses),
            vec!["192.168.1.20".parse::<IpAddr>().unwrap()]
        );
    }

    #[test]
    fn neighborhood_covers_the_full_slash_24() {
        let expanded = neighborhood("10.1.2.3".parse().unwrap());
        assert_eq!(expanded.len(), 256);
        assert_eq!(expanded[0], "10.1.2.0".parse::<IpAddr>().unwrap());
        assert_eq!(expanded[255], "10.1.2.255".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn ipv6_has_no_neighborhood() {
        assert!(neighborhood("::1".parse().unwrap()).is_empty());
    }
}
