use std::sync::{Arc, Mutex};

use super::*;
use crate::context::{CorsMode, StackContext};
use crate::template::ResourceType;

mod cors;

#[derive(Clone)]
struct SharedLogBuffer(Arc<Mutex<Vec<u8>>>);

struct SharedLogWriter(Arc<Mutex<Vec<u8>>>);

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedLogBuffer {
    type Writer = SharedLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SharedLogWriter(Arc::clone(&self.0))
    }
}

impl std::io::Write for SharedLogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn context() -> StackContext {
    StackContext::new("ItemsStack", "ItemsApi", "Items")
}

fn unit(name: &str) -> ComputeUnit {
    ComputeUnit::new(name, format!("{name}.handler"), "python3.7", "src")
}

fn synth_with_units(mode: CorsMode, names: &[&str]) -> Synthesizer {
    let mut synth = Synthesizer::new(context().with_cors_mode(mode));
    for name in names {
        synth.register_compute_unit(unit(name)).unwrap();
    }
    synth
}

/// `/items` (GET getAll), `/items/{id}` (GET getOne),
/// `/items/{id}/children` (GET getChildren), all with a CORS preflight and the
/// same read-only grant on every unit.
fn items_synth() -> Synthesizer {
    let mut synth = synth_with_units(CorsMode::Strict, &["getOne", "getAll", "getChildren"]);
    for name in ["getOne", "getAll", "getChildren"] {
        synth
            .attach_permission(name, PermissionGrant::read_only("service"))
            .unwrap();
    }

    let items = synth.add_resource(synth.root(), "items").unwrap();
    synth.bind_method(items, HttpMethod::Get, "getAll").unwrap();

    let item = synth.add_resource(items, "{id}").unwrap();
    synth.bind_method(item, HttpMethod::Get, "getOne").unwrap();

    let children = synth.add_resource(item, "children").unwrap();
    synth
        .bind_method(children, HttpMethod::Get, "getChildren")
        .unwrap();

    for node in [items, item, children] {
        synth.add_cors_preflight(node).unwrap();
    }
    synth
}

fn integration_type(resource: &TemplateResource) -> &str {
    resource.property("Integration")["Type"]
        .as_str()
        .unwrap_or_default()
}

fn methods_with_integration<'a>(
    template: &'a DeploymentTemplate,
    integration: &str,
) -> Vec<(&'a str, &'a TemplateResource)> {
    template
        .resources_of_type(ResourceType::Method)
        .filter(|(_, r)| integration_type(r) == integration)
        .collect()
}
