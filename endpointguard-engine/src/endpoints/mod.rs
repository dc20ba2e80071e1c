//! Endpoint discovery (spec §4.4): route handlers, server actions, and
//! typed-RPC procedures.

pub mod actions;
pub mod mutation;
pub mod public_intent;
pub mod routes;
pub mod rpc;

use std::path::Path;

use crate::model::Endpoint;
use crate::resolver::ModuleResolver;

pub fn discover_all(root: &Path, app_dir: &Path, resolver: &ModuleResolver) -> Vec<Endpoint> {
    let mut endpoints = Vec::new();
    endpoints.extend(routes::discover(root, app_dir).into_iter().map(Endpoint::RouteHandler));
    endpoints.extend(actions::discover(root, app_dir).into_iter().map(Endpoint::ServerAction));
    endpoints.extend(rpc::discover(root, resolver).into_iter().map(Endpoint::RpcProcedure));
    endpoints
}
