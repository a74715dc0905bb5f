//! WGSL sources for the render passes
//!
//! Passes share a few snippets (fullscreen triangle, sky uniform and
//! projection helpers, colour transfer) which are concatenated in front of
//! each pass body.

/// Fullscreen triangle with a top-left origin UV
const FULLSCREEN: &str = r#"
struct FullscreenOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) vertex_index: u32) -> FullscreenOutput {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0)
    );

    var out: FullscreenOutput;
    let pos = positions[vertex_index];
    out.clip_position = vec4<f32>(pos, 0.0, 1.0);
    out.uv = vec2<f32>(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    return out;
}

fn ndc_from_uv(uv: vec2<f32>) -> vec2<f32> {
    return vec2<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
}
"#;

const SKY_COMMON: &str = r#"
struct SkyUniform {
    view: vec4<f32>,
    right: vec4<f32>,
    up: vec4<f32>,
    camera_pos: vec4<f32>,
    sky: vec4<f32>,
    viewport: vec4<f32>,
    star: vec4<f32>,
    lines: vec4<f32>,
    line_color: vec4<f32>,
    glow: vec4<f32>,
    base: vec4<f32>,
};

@group(0) @binding(0) var<uniform> sky: SkyUniform;

const TAU: f32 = 6.28318530718;
const OFFSCREEN: vec4<f32> = vec4<f32>(-10.0, -10.0, 0.0, 1.0);

fn wrap_azimuth(az: f32) -> f32 {
    var a = az;
    if (a < 0.0) {
        a = a + TAU;
    }
    return a;
}

// (azimuth, altitude) for the current sidereal time and latitude
fn horizontal_from_equatorial(ra: f32, dec: f32) -> vec2<f32> {
    let lat = sky.sky.y;
    let ha = sky.sky.x - ra;
    let sin_alt = sin(dec) * sin(lat) + cos(dec) * cos(lat) * cos(ha);
    let alt = asin(clamp(sin_alt, -1.0, 1.0));
    let y = -cos(dec) * sin(ha);
    let x = sin(dec) * cos(lat) - cos(dec) * sin(lat) * cos(ha);
    return vec2<f32>(wrap_azimuth(atan2(y, x)), alt);
}

fn direction_from_horizontal(hz: vec2<f32>) -> vec3<f32> {
    let c = cos(hz.y);
    return vec3<f32>(c * sin(hz.x), sin(hz.y), c * cos(hz.x));
}

fn horizontal_from_direction(dir: vec3<f32>) -> vec2<f32> {
    return vec2<f32>(wrap_azimuth(atan2(dir.x, dir.z)), asin(clamp(dir.y, -1.0, 1.0)));
}

// xy = NDC, z = 1 in front of the camera, 0 behind
fn project_direction(dir: vec3<f32>) -> vec3<f32> {
    if (dot(sky.view.xyz, dir) <= 0.0) {
        return vec3<f32>(0.0, 0.0, 0.0);
    }
    let d = dir - sky.camera_pos.xyz;
    let depth = dot(d, sky.view.xyz);
    if (depth <= 1e-6) {
        return vec3<f32>(0.0, 0.0, 0.0);
    }
    let x = dot(d, sky.right.xyz) / depth / (sky.view.w * sky.right.w);
    let y = dot(d, sky.up.xyz) / depth / sky.view.w;
    return vec3<f32>(x, y, 1.0);
}

fn in_frame(ndc: vec2<f32>) -> bool {
    let limit = 1.0 + 2.0 * sky.camera_pos.w;
    return abs(ndc.x) <= limit && abs(ndc.y) <= limit;
}

// Point on the unit sphere seen through an NDC position
fn unproject_ndc(ndc: vec2<f32>) -> vec3<f32> {
    let ray = normalize(
        sky.view.xyz
            + sky.right.xyz * (ndc.x * sky.view.w * sky.right.w)
            + sky.up.xyz * (ndc.y * sky.view.w)
    );
    let origin = sky.camera_pos.xyz;
    let b = dot(origin, ray);
    let c = dot(origin, origin) - 1.0;
    let s = -b + sqrt(max(b * b - c, 0.0));
    return normalize(origin + ray * s);
}
"#;

const COLOR: &str = r#"
fn linear_to_srgb(color: vec3<f32>) -> vec3<f32> {
    let c = clamp(color, vec3<f32>(0.0), vec3<f32>(1.0));
    let low = c * 12.92;
    let high = 1.055 * pow(c, vec3<f32>(1.0 / 2.4)) - 0.055;
    return select(high, low, c <= vec3<f32>(0.0031308));
}
"#;

const BACKGROUND: &str = r#"
@fragment
fn fs_background(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let dir = unproject_ndc(ndc_from_uv(in.uv));
    let alt = asin(clamp(dir.y, -1.0, 1.0));

    let rise = smoothstep(-0.10, 0.02, alt);
    let fall = 1.0 - 0.7 * smoothstep(0.05, 0.6, alt);
    let overhead = 1.0 - 0.9 * smoothstep(0.6, 1.5, alt);
    let glow = rise * fall * overhead * sky.glow.w;

    return vec4<f32>(sky.base.rgb + sky.glow.rgb * glow, 1.0);
}
"#;

const CONSTELLATIONS: &str = r#"
struct LineOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) side: f32,
    @location(1) alpha: f32,
};

@vertex
fn vs_line(@builtin(vertex_index) vertex_index: u32, @location(0) segment: vec4<f32>) -> LineOutput {
    var ends = array<f32, 6>(0.0, 0.0, 1.0, 1.0, 0.0, 1.0);
    var sides = array<f32, 6>(-1.0, 1.0, -1.0, -1.0, 1.0, 1.0);

    var out: LineOutput;
    out.clip_position = OFFSCREEN;
    out.side = 0.0;
    out.alpha = 0.0;

    let a = horizontal_from_equatorial(segment.x, segment.y);
    let b = horizontal_from_equatorial(segment.z, segment.w);
    if (a.y <= 0.0 || b.y <= 0.0) {
        return out;
    }

    let pa = project_direction(direction_from_horizontal(a));
    let pb = project_direction(direction_from_horizontal(b));
    if (pa.z < 0.5 || pb.z < 0.5 || !in_frame(pa.xy) || !in_frame(pb.xy)) {
        return out;
    }

    // Expand in pixel space so the width is resolution independent
    let half_size = sky.viewport.xy * 0.5;
    let start = pa.xy * half_size;
    let end = pb.xy * half_size;
    let along = end - start;
    let len = length(along);
    if (len < 1e-4) {
        return out;
    }
    let normal = vec2<f32>(-along.y, along.x) / len;
    let side = sides[vertex_index];
    let pixel = mix(start, end, ends[vertex_index]) + normal * side * sky.lines.x;

    out.clip_position = vec4<f32>(pixel / half_size, 0.0, 1.0);
    out.side = side;
    out.alpha = sky.lines.y * smoothstep(0.0, sky.lines.z, min(a.y, b.y));
    return out;
}

@fragment
fn fs_line(in: LineOutput) -> @location(0) vec4<f32> {
    let edge = 1.0 - smoothstep(0.5, 1.0, abs(in.side));
    let alpha = in.alpha * edge;
    return vec4<f32>(sky.line_color.rgb * alpha, alpha);
}
"#;

const STARS: &str = r#"
struct StarOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) local: vec2<f32>,
    @location(1) color: vec3<f32>,
};

fn bv_to_rgb(bv: f32) -> vec3<f32> {
    let b = clamp(bv, -0.4, 1.5);
    if (b < 0.0) {
        return mix(vec3<f32>(0.60, 0.70, 1.00), vec3<f32>(0.80, 0.86, 1.00), (b + 0.4) / 0.4);
    }
    if (b < 0.3) {
        return mix(vec3<f32>(0.80, 0.86, 1.00), vec3<f32>(1.00, 0.98, 0.96), b / 0.3);
    }
    if (b < 0.6) {
        return mix(vec3<f32>(1.00, 0.98, 0.96), vec3<f32>(1.00, 0.95, 0.82), (b - 0.3) / 0.3);
    }
    if (b < 1.0) {
        return mix(vec3<f32>(1.00, 0.95, 0.82), vec3<f32>(1.00, 0.82, 0.60), (b - 0.6) / 0.4);
    }
    return mix(vec3<f32>(1.00, 0.82, 0.60), vec3<f32>(1.00, 0.66, 0.42), (b - 1.0) / 0.5);
}

@vertex
fn vs_star(@builtin(vertex_index) vertex_index: u32, @location(0) star: vec4<f32>) -> StarOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(-1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0)
    );

    var out: StarOutput;
    out.clip_position = OFFSCREEN;
    out.local = vec2<f32>(0.0);
    out.color = vec3<f32>(0.0);

    let magnitude = star.z;
    if (magnitude > sky.sky.z) {
        return out;
    }
    let hz = horizontal_from_equatorial(star.x, star.y);
    if (hz.y <= 0.0) {
        return out;
    }
    let p = project_direction(direction_from_horizontal(hz));
    if (p.z < 0.5 || !in_frame(p.xy)) {
        return out;
    }

    let flux = pow(10.0, -0.4 * (magnitude - sky.star.x));
    let brightness = sky.star.y * flux / (flux + 1.0);
    let root = sqrt(flux);
    let size_px = mix(sky.star.z, sky.star.w, root / (root + 1.0));

    let corner = corners[vertex_index];
    let offset = corner * size_px * sky.viewport.zw;
    out.clip_position = vec4<f32>(p.xy + offset, 0.0, 1.0);
    out.local = corner;
    out.color = bv_to_rgb(star.w) * brightness;
    return out;
}

@fragment
fn fs_star(in: StarOutput) -> @location(0) vec4<f32> {
    let r2 = dot(in.local, in.local);
    let core = exp(-r2 * 6.0);
    let halo = max(1.0 - r2, 0.0);
    let intensity = core + 0.15 * halo * halo;
    return vec4<f32>(in.color * intensity, 0.0);
}
"#;

const POST_COMMON: &str = r#"
struct PostUniform {
    bloom: vec4<f32>,
    tone: vec4<f32>,
    output: vec4<f32>,
};

@group(0) @binding(0) var t_source: texture_2d<f32>;
@group(0) @binding(1) var s_linear: sampler;
@group(0) @binding(2) var<uniform> post: PostUniform;
"#;

const BRIGHT: &str = r#"
@fragment
fn fs_bright(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let color = textureSampleLevel(t_source, s_linear, in.uv, 0.0).rgb;
    let l = max(dot(color, vec3<f32>(0.2126, 0.7152, 0.0722)), 0.0);
    let compressed = l / (1.0 + l);
    let weight = smoothstep(post.bloom.x, post.bloom.x + post.bloom.y, compressed);
    return vec4<f32>(color * weight, 1.0);
}
"#;

const BLUR: &str = r#"
struct BlurUniform {
    direction: vec4<f32>,
    weights: array<vec4<f32>, 2>,
};

@group(0) @binding(0) var t_source: texture_2d<f32>;
@group(0) @binding(1) var s_linear: sampler;
@group(0) @binding(2) var<uniform> blur: BlurUniform;

fn weight(i: i32) -> f32 {
    return blur.weights[i / 4][i % 4];
}

@fragment
fn fs_blur(in: FullscreenOutput) -> @location(0) vec4<f32> {
    var color = textureSampleLevel(t_source, s_linear, in.uv, 0.0).rgb * weight(0);
    let radius = i32(blur.direction.z);
    for (var i = 1; i <= radius; i = i + 1) {
        let offset = blur.direction.xy * f32(i);
        let forward = textureSampleLevel(t_source, s_linear, in.uv + offset, 0.0).rgb;
        let backward = textureSampleLevel(t_source, s_linear, in.uv - offset, 0.0).rgb;
        color = color + (forward + backward) * weight(i);
    }
    return vec4<f32>(color, 1.0);
}
"#;

const COMPOSITE: &str = r#"
@group(0) @binding(3) var t_bloom: texture_2d<f32>;

fn reinhard_extended(c: vec3<f32>, white: f32) -> vec3<f32> {
    return c * (1.0 + c / (white * white)) / (1.0 + c);
}

fn soft_clip(c: vec3<f32>, knee: f32, ceiling: f32) -> vec3<f32> {
    let range = ceiling - knee;
    let shoulder = knee + range * (1.0 - exp(-(c - knee) / range));
    return select(shoulder, c, c <= vec3<f32>(knee));
}

@fragment
fn fs_composite(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let scene = textureSampleLevel(t_source, s_linear, in.uv, 0.0).rgb;
    let bloom = textureSampleLevel(t_bloom, s_linear, in.uv, 0.0).rgb;
    var color = max((scene + bloom * post.bloom.z) * post.bloom.w, vec3<f32>(0.0));

    if (post.tone.x < 0.5) {
        color = reinhard_extended(color, post.tone.y);
    } else {
        color = soft_clip(color, post.tone.z, post.tone.w);
    }
    if (post.output.x > 0.5) {
        color = linear_to_srgb(color);
    }
    return vec4<f32>(color, 1.0);
}
"#;

const SILHOUETTE: &str = r#"
struct SkylineUniform {
    info: vec4<f32>,
    colors: array<vec4<f32>, 3>,
};

@group(1) @binding(0) var t_skyline: texture_2d<f32>;
@group(1) @binding(1) var<uniform> skyline: SkylineUniform;

@fragment
fn fs_silhouette(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let hz = horizontal_from_direction(unproject_ndc(ndc_from_uv(in.uv)));
    let alt_deg = degrees(hz.y);

    let width = i32(skyline.info.y);
    let column = clamp(i32(hz.x / TAU * f32(width)), 0, width - 1);
    let count = i32(skyline.info.x);

    // Far to near: each nearer layer taller than the pixel overwrites
    var winner = -1;
    for (var layer = 0; layer < count; layer = layer + 1) {
        let height = textureLoad(t_skyline, vec2<i32>(column, layer), 0).r;
        if (height > alt_deg) {
            winner = layer;
        }
    }
    if (winner < 0) {
        discard;
    }

    var color = skyline.colors[winner].rgb;
    if (skyline.info.z > 0.5) {
        color = linear_to_srgb(color);
    }
    return vec4<f32>(color, 1.0);
}
"#;

pub fn background() -> String {
    [FULLSCREEN, SKY_COMMON, BACKGROUND].concat()
}

pub fn constellations() -> String {
    [SKY_COMMON, CONSTELLATIONS].concat()
}

pub fn stars() -> String {
    [SKY_COMMON, STARS].concat()
}

pub fn bright() -> String {
    [FULLSCREEN, POST_COMMON, BRIGHT].concat()
}

pub fn blur() -> String {
    [FULLSCREEN, BLUR].concat()
}

pub fn composite() -> String {
    [FULLSCREEN, COLOR, POST_COMMON, COMPOSITE].concat()
}

pub fn silhouette() -> String {
    [FULLSCREEN, SKY_COMMON, COLOR, SILHOUETTE].concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(source: &str, needle: &str) -> usize {
        source.matches(needle).count()
    }

    #[test]
    fn test_entry_points_present() {
        let passes = [
            (background(), ["vs_fullscreen", "fs_background"]),
            (constellations(), ["vs_line", "fs_line"]),
            (stars(), ["vs_star", "fs_star"]),
            (bright(), ["vs_fullscreen", "fs_bright"]),
            (blur(), ["vs_fullscreen", "fs_blur"]),
            (composite(), ["vs_fullscreen", "fs_composite"]),
            (silhouette(), ["vs_fullscreen", "fs_silhouette"]),
        ];
        for (source, entries) in &passes {
            for entry in entries {
                assert_eq!(count(source, &format!("fn {entry}(")), 1, "{entry}");
            }
        }
    }

    #[test]
    fn test_snippets_not_duplicated() {
        for source in [
            background(),
            constellations(),
            stars(),
            bright(),
            blur(),
            composite(),
            silhouette(),
        ] {
            assert!(count(&source, "struct SkyUniform") <= 1);
            assert!(count(&source, "struct FullscreenOutput") <= 1);
            assert!(count(&source, "fn linear_to_srgb") <= 1);
        }
    }

    #[test]
    fn test_sky_uniform_fields_match_rust_layout() {
        let fields = SKY_COMMON
            .split("struct SkyUniform {")
            .nth(1)
            .and_then(|rest| rest.split("};").next())
            .unwrap()
            .matches("vec4<f32>")
            .count();
        assert_eq!(
            fields * 16,
            std::mem::size_of::<super::super::uniforms::SkyUniform>()
        );
    }
}
