//! Command-line entry point for the director
//!
//! Every subcommand runs against the in-memory control plane, which makes the
//! binary a dry-run planner: it shows which resources a topology needs, in
//! which order they are created, and that cleanup leaves nothing behind.

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::json;

use director::{
    BackendVariant, DirectorConfig, DirectorError, DirectorResult, InMemoryControlPlane, Layered,
    MeshDirector, PortSearch, ResourceKind, SecureDirector, TrafficDirector,
};
use shared::{logging, BackendProtocol, ResourceRef};
use tracing::{debug, info};

/// Plan Traffic Director topologies against a simulated control plane
#[derive(Parser)]
#[command(name = "director")]
#[command(about = "Creates and tears down Traffic Director resources in dependency order")]
pub struct Args {
    /// Project that owns every resource
    #[arg(long, env = "TD_PROJECT")]
    pub project: String,

    /// VPC network for forwarding and firewall rules
    #[arg(long, env = "TD_NETWORK", default_value = "default")]
    pub network: String,

    /// Leading segment of every resource name
    #[arg(long, env = "TD_RESOURCE_PREFIX")]
    pub resource_prefix: String,

    /// Trailing segment of every resource name (omitted when empty)
    #[arg(long, env = "TD_RESOURCE_SUFFIX", default_value = "")]
    pub resource_suffix: String,

    #[arg(long, env = "TD_COMPUTE_API_VERSION", default_value = "v1")]
    pub compute_api_version: String,

    /// Also create IPv6 proxy and forwarding rule
    #[arg(long, env = "TD_ENABLE_DUALSTACK")]
    pub enable_dualstack: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the composite setup and print the resulting inventory
    Setup(SetupArgs),

    /// Run the composite setup, then tear it down
    Cleanup {
        #[command(flatten)]
        setup: SetupArgs,

        /// Tear down from a fresh orchestrator using recomputed names
        #[arg(long)]
        force: bool,
    },

    /// Search for an unused forwarding rule port
    FindPort {
        #[arg(long, default_value = "1024")]
        lo: u16,

        #[arg(long, default_value = "65535")]
        hi: u16,

        #[arg(long, default_value = "25")]
        attempts: u32,

        /// Ports already bound on the simulated plane
        #[arg(long = "reserved", value_delimiter = ',')]
        reserved: Vec<u16>,
    },
}

#[derive(ClapArgs, Clone)]
pub struct SetupArgs {
    /// Hostname clients use to reach the service
    #[arg(long)]
    pub host: String,

    #[arg(long)]
    pub port: u16,

    /// Backend protocol (grpc or http2)
    #[arg(long, default_value = "grpc")]
    pub protocol: BackendProtocol,

    /// Fixed health check port instead of the serving port
    #[arg(long)]
    pub health_check_port: Option<u16>,

    /// NEG name backing the default backend service
    #[arg(long, default_value = "server-neg")]
    pub neg_name: String,

    /// Zones to resolve the NEG in
    #[arg(long, value_delimiter = ',', default_value = "us-central1-a")]
    pub zones: Vec<String>,

    /// Healthy replicas to wait for
    #[arg(long, default_value = "1")]
    pub replicas: u32,

    /// Layer a mesh and gRPC route on top of the base topology
    #[arg(long, conflicts_with_all = ["server_security", "client_security"])]
    pub mesh: bool,

    /// Create server TLS and endpoint policies
    #[arg(long)]
    pub server_security: bool,

    /// Create a client TLS policy and patch the backend service with it
    #[arg(long)]
    pub client_security: bool,

    #[arg(long, default_value = "default")]
    pub server_namespace: String,

    #[arg(long, default_value = "psm-grpc-server")]
    pub server_name: String,
}

impl Args {
    fn config(&self) -> DirectorConfig {
        DirectorConfig::new(&self.project, &self.resource_prefix)
            .with_suffix(&self.resource_suffix)
            .with_network(&self.network)
            .with_compute_api_version(&self.compute_api_version)
            .with_dualstack(self.enable_dualstack)
    }
}

fn main() -> DirectorResult<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::init_tracing_with_level(Some(&args.log_level));

    let config = args.config();
    config.validate()?;
    logging::log_startup(&format!(
        "director for project {} (prefix \"{}\", suffix \"{}\")",
        config.project, config.resource_prefix, config.resource_suffix
    ));

    let plane = InMemoryControlPlane::with_api_version(&config.project, &config.compute_api_version);
    let result = match &args.command {
        Command::Setup(setup) => run_setup(&plane, &config, setup).and_then(print_inventory),
        Command::Cleanup { setup, force } => run_cleanup(&plane, &config, setup, *force),
        Command::FindPort {
            lo,
            hi,
            attempts,
            reserved,
        } => run_find_port(&plane, &config, *lo, *hi, *attempts, reserved),
    };

    match &result {
        Ok(()) => logging::log_success("director finished"),
        Err(err) => logging::log_error("director", err),
    }
    result
}

fn seed_negs(plane: &InMemoryControlPlane, setup: &SetupArgs) {
    for zone in &setup.zones {
        plane.register_neg(&setup.neg_name, zone, setup.replicas);
    }
}

/// Backend membership shared by every topology flavour
fn attach_backends(base: &mut TrafficDirector<InMemoryControlPlane>, setup: &SetupArgs) -> DirectorResult<()> {
    base.add_backends(BackendVariant::Default, &setup.neg_name, setup.zones.as_slice(), None)?;
    base.wait_for_backends_healthy(BackendVariant::Default, setup.replicas)
}

/// Run the requested topology and return what the orchestrator tracks
fn run_setup(
    plane: &InMemoryControlPlane,
    config: &DirectorConfig,
    setup: &SetupArgs,
) -> DirectorResult<Vec<(ResourceKind, ResourceRef)>> {
    seed_negs(plane, setup);
    let topology = build_and_setup(plane, config, setup)?;
    Ok(topology.inventory())
}

/// Orchestrator flavours selectable from the command line
enum Topology {
    Base(TrafficDirector<InMemoryControlPlane>),
    Mesh(MeshDirector<InMemoryControlPlane, InMemoryControlPlane>),
    Secure(SecureDirector<InMemoryControlPlane, InMemoryControlPlane, InMemoryControlPlane>),
}

impl Topology {
    fn inventory(&self) -> Vec<(ResourceKind, ResourceRef)> {
        match self {
            Topology::Base(base) => base
                .registry()
                .present()
                .map(|(kind, resource)| (kind, resource.clone()))
                .collect(),
            Topology::Mesh(layered) => layered.inventory(),
            Topology::Secure(layered) => layered.inventory(),
        }
    }

    fn cleanup(&mut self, force: bool) -> DirectorResult<()> {
        match self {
            Topology::Base(base) => base.cleanup(force),
            Topology::Mesh(layered) => layered.cleanup(force),
            Topology::Secure(layered) => layered.cleanup(force),
        }
    }
}

fn build(plane: &InMemoryControlPlane, config: &DirectorConfig, setup: &SetupArgs) -> Topology {
    if setup.mesh {
        Topology::Mesh(Layered::with_mesh(plane.clone(), plane.clone(), config.clone()))
    } else if setup.server_security || setup.client_security {
        Topology::Secure(Layered::with_security(
            plane.clone(),
            plane.clone(),
            plane.clone(),
            config.clone(),
        ))
    } else {
        Topology::Base(TrafficDirector::new(plane.clone(), config.clone()))
    }
}

fn build_and_setup(
    plane: &InMemoryControlPlane,
    config: &DirectorConfig,
    setup: &SetupArgs,
) -> DirectorResult<Topology> {
    let mut topology = build(plane, config, setup);
    let protocol = Some(setup.protocol);

    match &mut topology {
        Topology::Base(base) => {
            base.setup_for_grpc(&setup.host, setup.port, protocol, setup.health_check_port)?;
            attach_backends(base, setup)?;
        }
        Topology::Mesh(layered) => {
            layered
                .base_mut()
                .setup_backend_for_grpc(protocol, setup.health_check_port)?;
            attach_backends(layered.base_mut(), setup)?;
            layered.create_mesh()?;
            layered.create_grpc_route(&setup.host, setup.port)?;
        }
        Topology::Secure(layered) => {
            if setup.server_security {
                layered.setup_server_security(
                    &setup.server_namespace,
                    &setup.server_name,
                    setup.port,
                    true,
                    true,
                )?;
            }
            layered
                .base_mut()
                .setup_for_grpc(&setup.host, setup.port, protocol, setup.health_check_port)?;
            attach_backends(layered.base_mut(), setup)?;
            if setup.client_security {
                layered.setup_client_security(&setup.server_namespace, &setup.server_name, true, true)?;
            }
        }
    }

    Ok(topology)
}

fn run_cleanup(
    plane: &InMemoryControlPlane,
    config: &DirectorConfig,
    setup: &SetupArgs,
    force: bool,
) -> DirectorResult<()> {
    seed_negs(plane, setup);
    let mut topology = build_and_setup(plane, config, setup)?;
    info!("Created {} resources", plane.inventory().len());

    if force {
        // A fresh orchestrator knows nothing but the naming tuple
        let mut fresh = build(plane, config, setup);
        fresh.cleanup(true)?;
    } else {
        topology.cleanup(false)?;
    }

    for entry in plane.journal() {
        debug!("{}", entry);
    }
    print_remaining(plane)
}

fn run_find_port(
    plane: &InMemoryControlPlane,
    config: &DirectorConfig,
    lo: u16,
    hi: u16,
    attempts: u32,
    reserved: &[u16],
) -> DirectorResult<()> {
    for port in reserved {
        plane.reserve_port(*port);
    }
    let director = TrafficDirector::new(plane.clone(), config.clone());
    let port = director.find_unused_forwarding_rule_port(PortSearch { lo, hi, attempts })?;
    println!("{}", serde_json::to_string_pretty(&json!({ "port": port }))?);
    Ok(())
}

fn print_inventory(inventory: Vec<(ResourceKind, ResourceRef)>) -> DirectorResult<()> {
    let entries: Vec<_> = inventory
        .into_iter()
        .map(|(kind, resource)| {
            json!({
                "kind": kind,
                "name": resource.name,
                "url": resource.url,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

fn print_remaining(plane: &InMemoryControlPlane) -> DirectorResult<()> {
    let remaining = plane.inventory();
    println!("{}", serde_json::to_string_pretty(&remaining)?);
    if remaining.is_empty() {
        Ok(())
    } else {
        Err(DirectorError::config(format!(
            "{} resources left behind after cleanup",
            remaining.len()
        )))
    }
}
