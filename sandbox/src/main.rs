// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Astra Sandbox
// A few assets serving each other resources through the broker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use astra_control::{Broker, CoreConfig};
use astra_core::{Asset, AssetCore, RequestState, ResourceAsk, Severity};
use crossbeam_channel::{SendError, Sender};

const MESH_SYMBOL: u64 = 1;
const MAX_LOD: i64 = 3;

#[derive(Debug)]
struct Mesh {
    lod: i64,
    vertex_count: usize,
}

#[derive(Debug)]
struct Texture {
    name: String,
    texels: Vec<u8>,
}

/// Builds meshes on demand, one per level of detail.
struct MeshLibrary {
    core: AssetCore,
    meshes: Mutex<HashMap<i64, Arc<Mesh>>>,
}

impl Asset for MeshLibrary {
    fn core(&self) -> &AssetCore {
        &self.core
    }

    fn resource_symbol(&self, name: &str) -> Option<u64> {
        matches!(name, "mesh" | "geometry").then_some(MESH_SYMBOL)
    }

    fn resolve(&self, ask: ResourceAsk) {
        if ask.resource().as_symbol() != Some(MESH_SYMBOL) {
            ask.invalidate();
            return;
        }

        let lod = ask.args().first().copied().unwrap_or(0);
        if !(0..=MAX_LOD).contains(&lod) {
            self.core
                .alert(format!("no mesh at LOD {lod}"), Severity::Warning);
            ask.invalidate();
            return;
        }

        let mesh = {
            let mut meshes = self.meshes.lock().unwrap_or_else(|e| e.into_inner());
            meshes
                .entry(lod)
                .or_insert_with(|| {
                    Arc::new(Mesh {
                        lod,
                        vertex_count: 24_000 >> (lod * 2),
                    })
                })
                .clone()
        };
        self.core
            .alert(format!("built mesh LOD {lod}"), Severity::Info);
        if let Err(e) = ask.set_resource(&mesh) {
            log::warn!("{e}");
        }
    }
}

type LoadJob = (ResourceAsk, Arc<Texture>);

/// The one thread that finishes texture loads for the streamer.
///
/// Jobs still queued when it stops are answered before the thread exits.
struct Loader {
    jobs: Mutex<Option<Sender<LoadJob>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Loader {
    fn spawn() -> std::io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<LoadJob>();
        let handle = thread::Builder::new()
            .name("texture-loader".to_string())
            .spawn(move || {
                for (ask, texture) in rx.iter() {
                    thread::sleep(Duration::from_millis(20));
                    if let Err(e) = ask.set_resource(&texture) {
                        log::warn!("{e}");
                    }
                }
            })?;
        Ok(Self {
            jobs: Mutex::new(Some(tx)),
            thread: Mutex::new(Some(handle)),
        })
    }

    fn submit(&self, job: LoadJob) {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        match jobs.as_ref() {
            Some(jobs) => {
                if let Err(SendError((ask, _))) = jobs.send(job) {
                    ask.invalidate();
                }
            }
            // Dropping the ask settles the request as DEAD.
            None => log::debug!("Loader stopped, refusing texture load."),
        }
    }

    /// Closes the queue and waits for the thread to finish.
    fn stop(&self) {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).take();
        let handle = self.thread.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Texture loader panicked.");
            }
        }
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Answers texture requests from its loader thread.
struct Streamer {
    core: AssetCore,
    loaded: Mutex<Vec<Arc<Texture>>>,
    loader: Loader,
}

impl Asset for Streamer {
    fn core(&self) -> &AssetCore {
        &self.core
    }

    fn resolve(&self, ask: ResourceAsk) {
        let Some(name) = ask.resource().as_name().map(str::to_owned) else {
            ask.invalidate();
            return;
        };

        let texture = Arc::new(Texture {
            name,
            texels: vec![0x7f; 64 * 64 * 4],
        });
        self.loaded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::clone(&texture));

        self.loader.submit((ask, texture));
    }
}

/// Consumes meshes and textures every frame.
struct RenderLoop {
    core: AssetCore,
}

impl Asset for RenderLoop {
    fn core(&self) -> &AssetCore {
        &self.core
    }
}

impl RenderLoop {
    fn frame(&self, frame: u64) {
        let lod = (frame as i64) % (MAX_LOD + 2);
        let mut mesh = self.core.request::<Mesh>("MeshLibrary", "mesh", &[lod]);
        let mut texture = self.core.request::<Texture>("Streamer", "brick", &[]);

        match mesh.wait_timeout(Duration::from_secs(1)) {
            RequestState::Ready => {
                if let Some(mesh) = mesh.get() {
                    log::info!(
                        "Frame {frame}: mesh LOD {} with {} vertices",
                        mesh.lod,
                        mesh.vertex_count
                    );
                }
            }
            state => log::info!("Frame {frame}: mesh LOD {lod} is {state}"),
        }

        if texture.wait_timeout(Duration::from_secs(1)) == RequestState::Ready {
            if let Some(texture) = texture.get() {
                log::info!(
                    "Frame {frame}: texture '{}' ({} bytes)",
                    texture.name,
                    texture.texels.len()
                );
            }
        }
    }
}

fn load_config() -> Result<CoreConfig> {
    match std::env::args().nth(1) {
        Some(path) => CoreConfig::load(&path),
        None => CoreConfig::from_json_str("{}"),
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let mut broker = Broker::start(config).context("failed to start the broker")?;

    let _library = broker.create_asset("MeshLibrary", |core| MeshLibrary {
        core,
        meshes: Mutex::new(HashMap::new()),
    })?;
    let loader = Loader::spawn().context("failed to start the texture loader")?;
    let streamer = broker.create_asset("Streamer", |core| Streamer {
        core,
        loaded: Mutex::new(Vec::new()),
        loader,
    })?;
    let renderer = broker.create_asset("RenderLoop", |core| RenderLoop { core })?;

    // A target nobody registered: raises a WARNING and yields a DEAD handle.
    let mut skybox = renderer.core.request::<Texture>("Skybox", "cubemap", &[]);
    log::info!("Skybox request settled as {}", skybox.wait());

    for frame in 0..6 {
        if broker.is_fatal() {
            log::error!("Fatal alert raised, leaving the main loop.");
            break;
        }
        renderer.frame(frame);
    }

    broker.sync();
    log::info!(
        "{} assets registered, {} cached requests",
        broker.asset_count(),
        broker.cache_len()
    );
    streamer.loader.stop();
    broker.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use astra_core::{AssetId, ResourceId, ResourceKey, ResourceRequest, ResourceType};

    fn job(name: &str) -> (Arc<ResourceRequest>, LoadJob) {
        let request = ResourceRequest::new(
            AssetId::from_raw(1),
            ResourceKey::new(AssetId::from_raw(2), ResourceId::from(name), vec![]),
            ResourceType::of::<Texture>(),
        );
        let texture = Arc::new(Texture {
            name: name.to_string(),
            texels: vec![0; 4],
        });
        (Arc::clone(&request), (ResourceAsk::new(request), texture))
    }

    #[test]
    fn test_stop_answers_queued_loads_and_joins() {
        // --- 1. ARRANGE ---
        let loader = Loader::spawn().unwrap();
        let (brick, brick_job) = job("brick");
        let (stone, stone_job) = job("stone");
        loader.submit(brick_job);
        loader.submit(stone_job);

        // --- 2. ACT ---
        loader.stop();

        // --- 3. ASSERT ---
        assert_eq!(brick.state(), RequestState::Ready);
        assert_eq!(stone.state(), RequestState::Ready);
        assert!(loader.thread.lock().unwrap().is_none());
    }

    #[test]
    fn test_loads_after_stop_go_dead() {
        let loader = Loader::spawn().unwrap();
        loader.stop();

        let (late, late_job) = job("late");
        loader.submit(late_job);

        assert_eq!(late.state(), RequestState::Dead);
    }
}
