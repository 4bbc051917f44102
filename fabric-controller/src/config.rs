// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Controller configuration.
//!
//! The configuration is layered using [figment]: built-in defaults, then an
//! optional TOML file, then environment variables prefixed with `FABRIC_`.
//!
//! ```toml
//! num_tiles = 4
//! arbitration = "round-robin"
//! load_request_gate = "joint"
//!
//! [node_address_ranges]
//! 0 = [0, 3]
//! 1 = [4, 7]
//!
//! [node_coords]
//! 0 = [0, 0]
//! 1 = [1, 0]
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use fabric_components::arbiter::policy::ArbitrationPolicy;
use fabric_engine::sim_error;
use fabric_engine::types::{SimError, SimResult};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::address_map::AddressRange;
use crate::packet::{Coord, NodeId};
use crate::routing::RoutingTables;

/// Prefix of environment variables that override the configuration.
pub const ENV_PREFIX: &str = "FABRIC_";

/// How a load request arriving from the network is admitted to the tile.
#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, Serialize, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadRequestGate {
    /// Address, source node and source tile must all be accepted together
    #[default]
    Joint,

    /// Only the address must be accepted, the other fields are written if
    /// possible and dropped otherwise
    AddressOnly,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    /// Number of tiles in each node. This value is also the tile id that
    /// addresses the controller and CPU.
    pub num_tiles: u32,

    /// Inclusive address range owned by each node.
    pub node_address_ranges: BTreeMap<String, [u64; 2]>,

    /// Position of each node in the fabric.
    pub node_coords: BTreeMap<String, [u32; 2]>,

    /// Arbitration between the local sources sharing the network output.
    pub arbitration: ArbitrationPolicy,

    pub load_request_gate: LoadRequestGate,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            num_tiles: 4,
            node_address_ranges: BTreeMap::new(),
            node_coords: BTreeMap::new(),
            arbitration: ArbitrationPolicy::default(),
            load_request_gate: LoadRequestGate::default(),
        }
    }
}

fn parse_node(key: &str) -> Result<NodeId, SimError> {
    match key.trim().parse::<u32>() {
        Ok(id) => Ok(NodeId(id)),
        Err(e) => sim_error!(format!("invalid node id '{key}': {e}")),
    }
}

fn extract(figment: &Figment) -> Result<ControllerConfig, SimError> {
    let config: ControllerConfig = figment
        .extract()
        .map_err(|e| SimError(format!("invalid configuration: {e}")))?;
    config.validate()?;
    Ok(config)
}

impl ControllerConfig {
    /// The layered sources: defaults, then `conf_file`, then the environment.
    pub fn figment(conf_file: Option<&Path>) -> Result<Figment, SimError> {
        let mut figment = Figment::new().merge(Serialized::defaults(ControllerConfig::default()));
        if let Some(path) = conf_file {
            if !path.is_file() {
                return sim_error!(format!(
                    "unable to read configuration file {}",
                    path.display()
                ));
            }
            figment = figment.merge(Toml::file(path));
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load and validate the configuration from all sources.
    pub fn load(conf_file: Option<&Path>) -> Result<Self, SimError> {
        extract(&Self::figment(conf_file)?)
    }

    /// Load and validate a configuration from TOML text on top of the
    /// defaults. The environment is not consulted.
    pub fn from_toml_str(toml: &str) -> Result<Self, SimError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(ControllerConfig::default()))
            .merge(Toml::string(toml));
        extract(&figment)
    }

    pub fn address_ranges(&self) -> Result<BTreeMap<NodeId, AddressRange>, SimError> {
        self.node_address_ranges
            .iter()
            .map(|(key, [begin, end])| -> Result<_, SimError> {
                Ok((parse_node(key)?, AddressRange::new(*begin, *end)))
            })
            .collect()
    }

    pub fn coords(&self) -> Result<BTreeMap<NodeId, Coord>, SimError> {
        self.node_coords
            .iter()
            .map(|(key, [x, y])| -> Result<_, SimError> {
                Ok((parse_node(key)?, Coord::new(*x, *y)))
            })
            .collect()
    }

    /// Build the shared routing tables.
    pub fn build_tables(&self) -> Result<Rc<RoutingTables>, SimError> {
        let tables = RoutingTables::build(&self.address_ranges()?, &self.coords()?)?;
        Ok(Rc::new(tables))
    }

    /// Check that everything a controller needs can be built.
    pub fn validate(&self) -> SimResult {
        if self.num_tiles == 0 {
            return sim_error!("num_tiles must be at least 1");
        }
        self.build_tables().map(|_| ())
    }
}
