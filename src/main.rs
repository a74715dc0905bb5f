//! NightSky - real-time night sky over a city skyline
//!
//! Streams a magnitude-sorted star catalog to the GPU and draws it with
//! constellation lines, bloom and a procedural skyline silhouette, as seen
//! from a fixed observer in Tokyo.

mod astronomy;
mod config;
mod data;
mod error;
mod renderer;
mod skyline;
mod ui;

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use eframe::egui;

use astronomy::{local_sidereal_time, OBSERVER};
use config::{Cli, Command, QualityChoice, ViewerConfig};
use data::{
    load_star_meta, pack, CatalogEvent, CatalogWorker, LoadProgress, StreamingLoader,
    MAX_EVENTS_PER_FRAME, RECORD_SIZE,
};
use error::{RenderError, RenderResult};
use renderer::{
    viewport_pixels, with_renderer, Camera, IdleRotation, QualityTier, RendererOptions,
    SkyCallback, SkyRenderData, StarfieldRenderer,
};
use ui::{draw_compass, draw_error, draw_status, StatusInfo};

/// Everything that exists once the renderer is up
struct Session {
    render_state: egui_wgpu::RenderState,
    loader: StreamingLoader,
    worker: CatalogWorker,
}

/// Application state
pub struct NightSkyApp {
    config: ViewerConfig,
    session: Option<Session>,
    fatal: Option<RenderError>,
    progress: Option<LoadProgress>,

    // Camera
    camera: Camera,
    camera_drag: Option<egui::Pos2>,
    idle: IdleRotation,
    show_constellations: bool,

    last_frame_time: Instant,
}

impl NightSkyApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: ViewerConfig) -> Self {
        let show_constellations = config.show_constellations;
        let (session, fatal) = match Self::start(cc, &config) {
            Ok(session) => (Some(session), None),
            Err(e) => {
                log::error!("Failed to start render session: {}", e);
                (None, Some(e))
            }
        };

        Self {
            config,
            session,
            fatal,
            progress: None,
            camera: Camera::default(),
            camera_drag: None,
            idle: IdleRotation::default(),
            show_constellations,
            last_frame_time: Instant::now(),
        }
    }

    fn start(cc: &eframe::CreationContext<'_>, config: &ViewerConfig) -> RenderResult<Session> {
        let Some(render_state) = cc.wgpu_render_state.clone() else {
            return Err(RenderError::UnsupportedPlatform(
                "eframe created no wgpu render state".into(),
            ));
        };

        let meta = load_star_meta(&config.data_dir)?;

        let adapter_info = render_state.adapter.get_info();
        log::info!(
            "Adapter: {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.device_type,
            adapter_info.backend
        );
        let quality = config.quality.resolve(adapter_info.device_type);
        let options = RendererOptions::new(quality, config.tone_mapping.fixed(), meta.star_count);

        let mut renderer = StarfieldRenderer::new();
        renderer.initialize(
            &render_state.device,
            &render_state.queue,
            &render_state.adapter,
            render_state.target_format,
            options,
        )?;

        let loader = StreamingLoader::new(RECORD_SIZE, meta.total_bytes())
            .with_capacity(renderer.star_capacity() as u64);

        render_state
            .renderer
            .write()
            .callback_resources
            .insert(renderer);

        let worker = CatalogWorker::spawn(config.data_dir.clone(), config.chunk_size)
            .map_err(|e| RenderError::data_fetch("catalog reader", e))?;
        log::info!("Streaming star catalog from {}", config.data_dir.display());

        Ok(Session {
            render_state,
            loader,
            worker,
        })
    }

    fn process_catalog_events(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let render_state = &session.render_state;

        for _ in 0..MAX_EVENTS_PER_FRAME {
            let Some(event) = session.worker.poll() else {
                break;
            };
            match event {
                CatalogEvent::StarChunk(chunk) => {
                    let loader = &mut session.loader;
                    let progress = with_renderer(render_state, |renderer| {
                        renderer.upload_stars(&render_state.queue, loader, &chunk)
                    })
                    .flatten();
                    if progress.is_some() {
                        self.progress = progress;
                    }
                }
                CatalogEvent::StarsFinished => {
                    let summary = session.loader.finish();
                    self.progress = Some(summary.progress);
                    log::info!(
                        "Star catalog loaded: {} records ({} over capacity)",
                        summary.records,
                        summary.overflow_records
                    );
                }
                CatalogEvent::StarsFailed(reason) => {
                    log::error!("Star stream failed: {}", reason);
                    self.fatal = Some(RenderError::data_fetch("stars.bin", reason));
                    break;
                }
                CatalogEvent::Constellations(segments) => {
                    with_renderer(render_state, |renderer| {
                        renderer.set_constellations(&render_state.device, &segments)
                    });
                }
                CatalogEvent::ConstellationsFailed(reason) => {
                    log::warn!(
                        "Constellation lines unavailable, drawing stars only: {}",
                        reason
                    );
                    with_renderer(render_state, |renderer| {
                        renderer.set_constellations(&render_state.device, &[])
                    });
                }
            }
        }

        if self.fatal.is_some() {
            self.shutdown();
        }
    }

    fn handle_camera_input(&mut self, ctx: &egui::Context, response: &egui::Response) {
        let input = ctx.input(|i| i.clone());
        let viewport_rect = response.rect;
        let mut touched = false;

        if response.double_clicked() {
            self.camera.reset();
            touched = true;
        }

        if let Some(pos) = input.pointer.hover_pos() {
            if viewport_rect.contains(pos) {
                let scroll = input.raw_scroll_delta.y;
                if scroll != 0.0 {
                    self.camera.scroll(scroll);
                    touched = true;
                }

                let pinch = input.zoom_delta();
                if pinch != 1.0 {
                    self.camera.zoom(1.0 / pinch);
                    touched = true;
                }

                if input.pointer.button_down(egui::PointerButton::Primary) {
                    if let Some(last_pos) = self.camera_drag {
                        let delta = pos - last_pos;
                        self.camera.drag(delta.x, delta.y, viewport_rect.height());
                    }
                    self.camera_drag = Some(pos);
                    touched = true;
                } else {
                    self.camera_drag = None;
                }
            }
        }

        if input.key_pressed(egui::Key::C) {
            self.show_constellations = !self.show_constellations;
        }

        let tier = if input.key_pressed(egui::Key::Num1) {
            Some(QualityTier::Low)
        } else if input.key_pressed(egui::Key::Num2) {
            Some(QualityTier::Medium)
        } else if input.key_pressed(egui::Key::Num3) {
            Some(QualityTier::High)
        } else {
            None
        };
        if let Some(tier) = tier {
            self.switch_quality(tier);
        }

        if touched {
            self.idle.touch();
        }
    }

    fn switch_quality(&mut self, tier: QualityTier) {
        let Some(session) = &self.session else {
            return;
        };
        let render_state = &session.render_state;
        let quality = QualityChoice::Fixed(tier).resolve(render_state.adapter.get_info().device_type);
        with_renderer(render_state, |renderer| {
            renderer.set_quality(&render_state.device, &render_state.queue, quality)
        });
    }

    fn render_sky(&mut self, ui: &mut egui::Ui) {
        let available = ui.available_rect_before_wrap();
        let (response, painter) = ui.allocate_painter(available.size(), egui::Sense::click_and_drag());
        let rect = response.rect;

        if let Some(error) = &self.fatal {
            draw_error(&painter, rect, &error.user_message());
            return;
        }
        if self.session.is_none() {
            return;
        }

        self.handle_camera_input(ui.ctx(), &response);

        let Some(session) = &self.session else {
            return;
        };
        let time = self.config.clock.now();
        let render_state = &session.render_state;
        let counts = with_renderer(render_state, |renderer| {
            renderer.set_render_data(SkyRenderData {
                camera: self.camera,
                time,
                show_constellations: self.show_constellations,
            });
            (renderer.loaded_star_count(), renderer.segment_count())
        });

        painter.add(egui_wgpu::Callback::new_paint_callback(
            rect,
            SkyCallback {
                viewport_size: viewport_pixels(rect, ui.ctx().pixels_per_point()),
            },
        ));

        let (stars, segments) = counts.unwrap_or_default();
        draw_compass(&painter, rect, &self.camera);
        draw_status(
            &painter,
            rect,
            &StatusInfo {
                camera: self.camera,
                lst: local_sidereal_time(time, OBSERVER.longitude_deg),
                progress: self.progress,
                stars,
                segments: if self.show_constellations { segments } else { 0 },
            },
        );
    }

    /// Dispose the renderer and drop the reader. Idempotent.
    fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            with_renderer(&session.render_state, StarfieldRenderer::dispose);
        }
    }
}

impl eframe::App for NightSkyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let dt = (now - self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        self.process_catalog_events();
        self.idle.tick(dt, &mut self.camera);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(egui::Color32::BLACK))
            .show(ctx, |ui| self.render_sky(ui));

        if self.fatal.is_none() {
            ctx.request_repaint();
        }
    }

    fn on_exit(&mut self) {
        self.shutdown();
    }
}

impl Drop for NightSkyApp {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_viewer(config: ViewerConfig) -> Result<()> {
    log::info!("Starting NightSky...");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title("NightSky"),
        renderer: eframe::Renderer::Wgpu,
        wgpu_options: egui_wgpu::WgpuConfiguration {
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: Some(1),
            ..Default::default()
        },
        ..Default::default()
    };

    eframe::run_native(
        "NightSky",
        options,
        Box::new(|cc| Ok(Box::new(NightSkyApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command.clone() {
        Some(Command::PackStars(args)) => {
            let meta = pack::run_pack_stars(args)?;
            log::info!(
                "Packed {} stars (magnitude {:.2}..{:.2})",
                meta.star_count,
                meta.min_magnitude,
                meta.max_magnitude
            );
            Ok(())
        }
        Some(Command::PackConstellations(args)) => {
            let meta = pack::run_pack_constellations(args)?;
            log::info!(
                "Packed {} segments for {} constellations",
                meta.line_count,
                meta.constellation_count
            );
            Ok(())
        }
        None => run_viewer(ViewerConfig::from(&cli)),
    }
}
