/// Ray-trace compute program. One invocation per pixel in 16x16 work groups.
/// Nearest hit over spheres and planes, lit by every staged light with
/// inverse-square falloff and no shadows.
pub const RAY_TRACE_SHADER: &str = r#"
struct Sphere {
    center: vec3<f32>,
    radius: f32,
    color: vec3<f32>,
    roughness: f32,
};

struct Plane {
    center: vec3<f32>,
    u_min: f32,
    tangent: vec3<f32>,
    u_max: f32,
    bitangent: vec3<f32>,
    v_min: f32,
    normal: vec3<f32>,
    v_max: f32,
    color: vec3<f32>,
    material: f32,
};

struct Light {
    position: vec3<f32>,
    strength: f32,
    color: vec3<f32>,
    pad: f32,
};

struct Material {
    albedo: vec3<f32>,
    emissive: f32,
    glossiness: f32,
    normal: f32,
    pad: vec2<f32>,
};

struct Frame {
    position: vec3<f32>,
    sphere_count: u32,
    forwards: vec3<f32>,
    plane_count: u32,
    right: vec3<f32>,
    light_count: u32,
    up: vec3<f32>,
    material_count: u32,
    resolution: vec2<u32>,
    tan_half_fov: f32,
    aspect: f32,
};

@group(0) @binding(0) var image: texture_storage_2d<rgba8unorm, write>;
@group(0) @binding(1) var<storage, read> spheres: array<Sphere>;
@group(0) @binding(2) var<storage, read> planes: array<Plane>;
@group(0) @binding(3) var<storage, read> lights: array<Light>;
@group(0) @binding(4) var<storage, read> materials: array<Material>;
@group(0) @binding(5) var<uniform> frame: Frame;

const FAR: f32 = 1.0e9;
const SKY: vec3<f32> = vec3<f32>(0.05, 0.06, 0.09);
const AMBIENT: f32 = 0.15;

struct Hit {
    t: f32,
    normal: vec3<f32>,
    color: vec3<f32>,
};

fn hit_sphere(s: Sphere, origin: vec3<f32>, dir: vec3<f32>, best: ptr<function, Hit>) {
    let oc = origin - s.center;
    let b = dot(dir, oc);
    let c = dot(oc, oc) - s.radius * s.radius;
    let disc = b * b - c;
    if (disc < 0.0) {
        return;
    }
    let t = -b - sqrt(disc);
    if (t > 0.0001 && t < (*best).t) {
        (*best).t = t;
        (*best).normal = normalize(origin + t * dir - s.center);
        (*best).color = s.color;
    }
}

fn hit_plane(p: Plane, origin: vec3<f32>, dir: vec3<f32>, best: ptr<function, Hit>) {
    let denom = dot(p.normal, dir);
    if (abs(denom) < 0.000001) {
        return;
    }
    let t = dot(p.center - origin, p.normal) / denom;
    if (t <= 0.0001 || t >= (*best).t) {
        return;
    }
    let offset = origin + t * dir - p.center;
    let u = dot(offset, p.tangent);
    let v = dot(offset, p.bitangent);
    if (u < p.u_min || u > p.u_max || v < p.v_min || v > p.v_max) {
        return;
    }
    var color = p.color;
    let m = u32(p.material);
    if (m < frame.material_count) {
        color = color * materials[m].albedo;
    }
    (*best).t = t;
    (*best).normal = p.normal;
    (*best).color = color;
}

@compute @workgroup_size(16, 16, 1)
fn cs_main(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= frame.resolution.x || id.y >= frame.resolution.y) {
        return;
    }
    let size = vec2<f32>(frame.resolution);
    let ndc = (vec2<f32>(id.xy) + vec2<f32>(0.5)) / size * 2.0 - vec2<f32>(1.0);
    let dir = normalize(
        frame.forwards
        + ndc.x * frame.aspect * frame.tan_half_fov * frame.right
        - ndc.y * frame.tan_half_fov * frame.up
    );

    var best: Hit;
    best.t = FAR;
    best.normal = vec3<f32>(0.0);
    best.color = SKY;

    for (var i = 0u; i < frame.sphere_count; i = i + 1u) {
        hit_sphere(spheres[i], frame.position, dir, &best);
    }
    for (var i = 0u; i < frame.plane_count; i = i + 1u) {
        hit_plane(planes[i], frame.position, dir, &best);
    }

    var rgb = best.color;
    if (best.t < FAR) {
        let hit_point = frame.position + best.t * dir;
        var normal = best.normal;
        if (dot(normal, dir) > 0.0) {
            normal = -normal;
        }
        var light = vec3<f32>(AMBIENT);
        for (var i = 0u; i < frame.light_count; i = i + 1u) {
            let to_light = lights[i].position - hit_point;
            let d2 = max(dot(to_light, to_light), 0.0001);
            let facing = max(dot(normal, to_light * inverseSqrt(d2)), 0.0);
            light = light + lights[i].color * lights[i].strength * facing / (1.0 + d2);
        }
        rgb = best.color * min(light, vec3<f32>(1.0));
    }
    textureStore(image, vec2<i32>(id.xy), vec4<f32>(rgb, 1.0));
}
"#;

/// Fullscreen triangle sampling the ray-traced image.
pub const BLIT_SHADER: &str = r#"
@group(0) @binding(0) var image: texture_2d<f32>;
@group(0) @binding(1) var image_sampler: sampler;

struct BlitOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_blit(@builtin(vertex_index) index: u32) -> BlitOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: BlitOutput;
    out.clip_position = vec4<f32>(uv * vec2<f32>(2.0, -2.0) + vec2<f32>(-1.0, 1.0), 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_blit(in: BlitOutput) -> @location(0) vec4<f32> {
    return textureSample(image, image_sampler, in.uv);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use roomtrace_render::bindings;

    #[test]
    fn compute_bindings_match_slot_constants() {
        for (slot, decl) in [
            (bindings::IMAGE, "var image: texture_storage_2d"),
            (bindings::SPHERES, "var<storage, read> spheres"),
            (bindings::PLANES, "var<storage, read> planes"),
            (bindings::LIGHTS, "var<storage, read> lights"),
            (bindings::MATERIALS, "var<storage, read> materials"),
            (bindings::FRAME, "var<uniform> frame"),
        ] {
            let line = format!("@group(0) @binding({slot}) {decl}");
            assert!(RAY_TRACE_SHADER.contains(&line), "missing `{line}`");
        }
    }

    #[test]
    fn workgroup_size_matches_default_tile() {
        let tile = roomtrace_render::DispatchConfig::default().tile_size;
        assert!(RAY_TRACE_SHADER.contains(&format!("@workgroup_size({tile}, {tile}, 1)")));
    }
}
