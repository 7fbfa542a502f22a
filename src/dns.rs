//! Route 53 synchroniser: a workload that keeps a hosted-zone A record
//! pointed at this host's public IP address.
//!
//! Everything here is sequential glue over the `aws` CLI and a plain HTTP
//! lookup. Failures are logged and retried on the next interval; the only
//! hard requirement from the service core is that the startup outcome is
//! reported exactly once and that `terminate` leaves nothing behind.
use std::{net::IpAddr, process::Command, thread, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{channel::StartupReporter, error::DnsError, service::Workload};

/// Parameters for one synchronised record.
#[derive(Debug, Clone)]
pub struct DnsConfig {
    /// Fully qualified record name, including the trailing dot.
    pub domain: String,
    /// Route 53 hosted-zone identifier.
    pub zone_id: String,
    /// Endpoint that echoes back the caller's public address.
    pub ip_url: String,
    /// Interval between steady-state checks.
    pub check_interval: Duration,
    /// Interval between initialisation retries.
    pub retry_interval: Duration,
}

impl DnsConfig {
    /// Configuration with the stock endpoint and intervals.
    pub fn new(domain: impl Into<String>, zone_id: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            zone_id: zone_id.into(),
            ip_url: "http://ip.42.pl/raw".into(),
            check_interval: Duration::from_secs(300),
            retry_interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordSetList {
    resource_record_sets: Vec<RecordSet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordSet {
    name: String,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(default)]
    resource_records: Vec<ResourceRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResourceRecord {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ChangeResponse {
    change_info: ChangeInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ChangeInfo {
    id: String,
    status: String,
}

/// Addresses the steady-state loop reconciles.
#[derive(Debug)]
struct SyncState {
    /// Address currently attached to the hosted-zone record.
    record_ip: String,
    /// Most recently observed public address.
    public_ip: String,
    /// Change ID awaiting commit, if any.
    pending_change: Option<String>,
}

/// The synchroniser workload.
pub struct DnsSync {
    config: DnsConfig,
    client: reqwest::blocking::Client,
}

impl DnsSync {
    /// Builds the workload and its HTTP client.
    pub fn new(config: DnsConfig) -> Result<Self, DnsError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { config, client })
    }

    fn route53(&self, args: &[&str]) -> Result<Vec<u8>, DnsError> {
        let output = Command::new("aws").arg("route53").args(args).output()?;
        if !output.status.success() {
            return Err(DnsError::CliFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Looks up the address currently attached to the configured A record.
    fn record_address(&self) -> Result<String, DnsError> {
        let stdout = self.route53(&[
            "list-resource-record-sets",
            "--hosted-zone-id",
            &self.config.zone_id,
        ])?;
        let list: RecordSetList = serde_json::from_slice(&stdout)?;
        extract_address(list, &self.config.domain)
    }

    /// Fetches this host's public address.
    fn public_address(&self) -> Result<String, DnsError> {
        let response = self.client.get(&self.config.ip_url).send()?;
        if !response.status().is_success() {
            return Err(DnsError::HttpStatus(response.status()));
        }

        let body = response.text()?;
        let trimmed = body.trim();
        if trimmed.parse::<IpAddr>().is_err() {
            return Err(DnsError::BadAddress(trimmed.to_string()));
        }
        Ok(trimmed.to_string())
    }

    /// Replaces the record's address, returning the pending change ID.
    fn submit_change(&self, old_ip: &str, new_ip: &str) -> Result<String, DnsError> {
        let batch = serde_json::json!({
            "Changes": [
                {
                    "Action": "DELETE",
                    "ResourceRecordSet": {
                        "Name": self.config.domain,
                        "Type": "A",
                        "ResourceRecords": [{ "Value": old_ip }],
                        "TTL": 300,
                    }
                },
                {
                    "Action": "CREATE",
                    "ResourceRecordSet": {
                        "Name": self.config.domain,
                        "Type": "A",
                        "ResourceRecords": [{ "Value": new_ip }],
                        "TTL": 300,
                    }
                }
            ]
        });

        let stdout = self.route53(&[
            "change-resource-record-sets",
            "--hosted-zone-id",
            &self.config.zone_id,
            "--change-batch",
            &batch.to_string(),
        ])?;
        let response: ChangeResponse = serde_json::from_slice(&stdout)?;
        Ok(response.change_info.id)
    }

    /// Whether a previously submitted change has been committed.
    fn change_committed(&self, change_id: &str) -> Result<bool, DnsError> {
        let stdout = self.route53(&["get-change", "--id", change_id])?;
        let response: ChangeResponse = serde_json::from_slice(&stdout)?;
        Ok(response.change_info.status != "PENDING")
    }

    /// One full reconciliation pass seeding the steady-state loop.
    fn initialize(&self) -> Result<SyncState, DnsError> {
        let record_ip = self.record_address()?;
        let public_ip = self.public_address()?;
        info!("Current address associated with domain: {record_ip}");
        info!("Current public IP address: {public_ip}");

        let pending_change = if record_ip != public_ip {
            let id = self.submit_change(&record_ip, &public_ip)?;
            info!("Submitted record change {id}.");
            Some(id)
        } else {
            None
        };

        Ok(SyncState {
            record_ip,
            public_ip,
            pending_change,
        })
    }

    /// One steady-state pass: settle any pending change, then reconcile the
    /// record with the observed public address.
    fn poll(&self, state: &mut SyncState) {
        if let Some(change_id) = &state.pending_change {
            match self.change_committed(change_id) {
                Ok(false) => {
                    info!("Previous change not yet committed.");
                    return;
                }
                Ok(true) => {
                    state.record_ip = state.public_ip.clone();
                    state.pending_change = None;
                }
                Err(err) => {
                    warn!("Failed to get change status: {err}");
                    return;
                }
            }
        }

        match self.public_address() {
            Ok(ip) => state.public_ip = ip,
            Err(err) => {
                warn!("Failed to get public IP: {err}");
                return;
            }
        }

        if state.record_ip == state.public_ip {
            info!("Public IP has not changed.");
            return;
        }

        match self.submit_change(&state.record_ip, &state.public_ip) {
            Ok(id) => {
                info!("Submitted record change {id}.");
                state.pending_change = Some(id);
            }
            Err(err) => warn!("Failed to update record: {err}"),
        }
    }
}

impl Workload for DnsSync {
    fn run(&self, startup: StartupReporter) {
        // Reaching this loop is steady state: lookup failures are retried on
        // an interval rather than failing startup.
        startup.success();
        info!("DNS synchroniser started for {}", self.config.domain);

        let mut state = loop {
            match self.initialize() {
                Ok(state) => break state,
                Err(err) => {
                    warn!("Initialisation failed: {err}");
                    warn!("Next attempt in {:?}.", self.config.retry_interval);
                    thread::sleep(self.config.retry_interval);
                }
            }
        };
        info!("Initialisation successful.");

        loop {
            thread::sleep(self.config.check_interval);
            self.poll(&mut state);
        }
    }

    fn terminate(&self) {
        info!("DNS synchroniser stopping.");
    }
}

/// Picks the address out of the zone listing, mirroring the warnings the
/// operator expects when the zone holds surprising duplicates.
fn extract_address(list: RecordSetList, domain: &str) -> Result<String, DnsError> {
    let mut matches = list
        .resource_record_sets
        .into_iter()
        .filter(|set| set.kind == "A" && set.name == domain);

    let Some(record) = matches.next() else {
        return Err(DnsError::MissingRecord(domain.to_string()));
    };
    if matches.next().is_some() {
        warn!("Multiple A records match domain; using first match.");
    }

    let mut values = record
        .resource_records
        .into_iter()
        .filter_map(|record| record.value);

    let Some(value) = values.next() else {
        return Err(DnsError::EmptyRecord);
    };
    if values.next().is_some() {
        warn!("Matching A record has multiple address values; only the first is considered.");
    }

    Ok(value)
}
