use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::renderer::gl::{self, GlError};
use crate::renderer::{texture_slot, UniformSlot};

/// The vertex attribute location of the POSITION attribute of glTF models.
pub const ATTR_LOC_POSITION: usize = 0;
/// The vertex attribute location of the NORMAL attribute of glTF models.
pub const ATTR_LOC_NORMAL: usize = 1;
/// The vertex attribute location of the TEXCOORD_0 attribute of glTF models.
pub const ATTR_LOC_TEXCOORD_0: usize = 2;

/// Per-node vertex shader parameters, std140 layout of the `vs_params` block.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct VsParams {
    pub model: Mat4,
    pub view_proj: Mat4,
    pub eye_pos: Vec3,
    pub _pad: f32,
}

/// A point light, std140 layout of the `light_params` block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LightParams {
    pub light_pos: Vec3,
    pub light_range: f32,
    pub light_color: Vec3,
    pub light_intensity: f32,
}

/// Metallic-roughness material factors, std140 layout of the
/// `metallic_params` block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MetallicParams {
    pub base_color_factor: Vec4,
    pub emissive_factor: Vec3,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub _pad: [f32; 3],
}

impl Default for MetallicParams {
    /// The glTF defaults for a material without explicit factors.
    fn default() -> Self {
        MetallicParams {
            base_color_factor: Vec4::ONE,
            emissive_factor: Vec3::ZERO,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            _pad: [0.0; 3],
        }
    }
}

const VERTEX_SHADER: &str = r#"#version 300 es
layout(location = 0) in vec3 POSITION;
layout(location = 1) in vec3 NORMAL;
layout(location = 2) in vec2 TEXCOORD_0;
layout(std140) uniform vs_params {
    mat4 model;
    mat4 view_proj;
    vec3 eye_pos;
};
out vec3 v_pos;
out vec3 v_nrm;
out vec2 v_uv;
out vec3 v_eye_pos;
void main() {
    vec4 pos = model * vec4(POSITION, 1.0);
    v_pos = pos.xyz / pos.w;
    v_nrm = (model * vec4(NORMAL, 0.0)).xyz;
    v_uv = TEXCOORD_0;
    v_eye_pos = eye_pos;
    gl_Position = view_proj * pos;
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;
layout(std140) uniform light_params {
    vec3 light_pos;
    float light_range;
    vec3 light_color;
    float light_intensity;
};
layout(std140) uniform metallic_params {
    vec4 base_color_factor;
    vec3 emissive_factor;
    float metallic_factor;
    float roughness_factor;
};
uniform sampler2D base_color_tex;
uniform sampler2D metallic_roughness_tex;
uniform sampler2D normal_tex;
uniform sampler2D occlusion_tex;
uniform sampler2D emissive_tex;
in vec3 v_pos;
in vec3 v_nrm;
in vec2 v_uv;
in vec3 v_eye_pos;
out vec4 FRAG_COLOR;

const float PI = 3.141592653589793;

vec3 srgb_to_linear(vec3 c) {
    return pow(c, vec3(2.2));
}

// Tangent frame from screen-space derivatives, glTF models without TANGENT
// attributes are the common case.
vec3 perturb_normal(vec3 n, vec3 p, vec2 uv) {
    vec3 dp1 = dFdx(p);
    vec3 dp2 = dFdy(p);
    vec2 duv1 = dFdx(uv);
    vec2 duv2 = dFdy(uv);
    vec3 dp2perp = cross(dp2, n);
    vec3 dp1perp = cross(n, dp1);
    vec3 t = dp2perp * duv1.x + dp1perp * duv2.x;
    vec3 b = dp2perp * duv1.y + dp1perp * duv2.y;
    float len_sq = max(dot(t, t), dot(b, b));
    if (len_sq < 1e-12) {
        return n;
    }
    float invmax = inversesqrt(len_sq);
    mat3 tbn = mat3(t * invmax, b * invmax, n);
    vec3 map = texture(normal_tex, uv).xyz * 2.0 - 1.0;
    return normalize(tbn * map);
}

float distribution_ggx(float n_dot_h, float roughness) {
    float a = roughness * roughness;
    float a2 = a * a;
    float d = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    return a2 / (PI * d * d);
}

float geometry_smith(float n_dot_v, float n_dot_l, float roughness) {
    float r = roughness + 1.0;
    float k = (r * r) / 8.0;
    float ggx_v = n_dot_v / (n_dot_v * (1.0 - k) + k);
    float ggx_l = n_dot_l / (n_dot_l * (1.0 - k) + k);
    return ggx_v * ggx_l;
}

vec3 fresnel_schlick(float cos_theta, vec3 f0) {
    return f0 + (1.0 - f0) * pow(1.0 - cos_theta, 5.0);
}

void main() {
    vec4 base_color = texture(base_color_tex, v_uv);
    base_color = vec4(srgb_to_linear(base_color.rgb), base_color.a) * base_color_factor;
    vec4 mr = texture(metallic_roughness_tex, v_uv);
    float metallic = mr.b * metallic_factor;
    float roughness = clamp(mr.g * roughness_factor, 0.04, 1.0);
    float occlusion = texture(occlusion_tex, v_uv).r;
    vec3 emissive = srgb_to_linear(texture(emissive_tex, v_uv).rgb) * emissive_factor;

    vec3 n = perturb_normal(normalize(v_nrm), v_pos, v_uv);
    vec3 v = normalize(v_eye_pos - v_pos);
    vec3 l = light_pos - v_pos;
    float dist = length(l);
    l /= dist;
    vec3 h = normalize(l + v);

    float range_falloff = clamp(1.0 - pow(dist / light_range, 4.0), 0.0, 1.0);
    float attenuation = range_falloff * range_falloff / max(dist * dist, 0.0001);
    vec3 radiance = light_color * light_intensity * attenuation;

    float n_dot_l = max(dot(n, l), 0.0);
    float n_dot_v = max(dot(n, v), 0.0001);
    float n_dot_h = max(dot(n, h), 0.0);
    vec3 f0 = mix(vec3(0.04), base_color.rgb, metallic);
    vec3 f = fresnel_schlick(max(dot(h, v), 0.0), f0);
    float d = distribution_ggx(n_dot_h, roughness);
    float g = geometry_smith(n_dot_v, n_dot_l, roughness);
    vec3 specular = d * g * f / (4.0 * n_dot_v * n_dot_l + 0.0001);
    vec3 diffuse = (1.0 - f) * (1.0 - metallic) * base_color.rgb / PI;

    vec3 color = (diffuse + specular) * radiance * n_dot_l;
    color += vec3(0.03) * base_color.rgb * occlusion;
    color += emissive;
    color = color / (color + vec3(1.0));

    // The framebuffer is not SRGB, so we transform the linear color to close-enough-to-srgb.
    FRAG_COLOR = vec4(pow(color, vec3(1.0 / 2.2)), base_color.a);
}
"#;

const UNIFORM_BLOCK_NAMES: [(UniformSlot, &str); 3] = [
    (UniformSlot::VsParams, "vs_params"),
    (UniformSlot::LightParams, "light_params"),
    (UniformSlot::MetallicParams, "metallic_params"),
];

const SAMPLER_NAMES: [(usize, &str); 5] = [
    (texture_slot::BASE_COLOR, "base_color_tex"),
    (texture_slot::METALLIC_ROUGHNESS, "metallic_roughness_tex"),
    (texture_slot::NORMAL, "normal_tex"),
    (texture_slot::OCCLUSION, "occlusion_tex"),
    (texture_slot::EMISSIVE, "emissive_tex"),
];

/// Compiles and returns the metallic-roughness shader program, with its
/// uniform blocks bound to [`UniformSlot::binding`] and its samplers to the
/// texture units of [`texture_slot`].
pub fn create_metallic_program() -> Result<gl::types::GLuint, GlError> {
    let vertex_shader = gl::create_shader(gl::VERTEX_SHADER, VERTEX_SHADER)?;
    let fragment_shader = match gl::create_shader(gl::FRAGMENT_SHADER, FRAGMENT_SHADER) {
        Ok(shader) => shader,
        Err(err) => {
            gl::call!(gl::DeleteShader(vertex_shader));
            return Err(err);
        }
    };
    let program = gl::create_program(&[vertex_shader, fragment_shader]);
    gl::call!(gl::DeleteShader(vertex_shader));
    gl::call!(gl::DeleteShader(fragment_shader));
    let program = program?;

    for (slot, name) in UNIFORM_BLOCK_NAMES {
        let Some(index) = gl::get_uniform_block_index(program, name) else {
            gl::call!(gl::DeleteProgram(program));
            return Err(GlError::MissingUniformBlock(name));
        };
        gl::call!(gl::UniformBlockBinding(program, index, slot.binding()));
    }
    gl::call!(gl::UseProgram(program));
    for (unit, name) in SAMPLER_NAMES {
        // Samplers the compiler optimized away simply have no location.
        if let Some(location) = gl::get_uniform_location(program, name) {
            gl::call!(gl::Uniform1i(location, unit as gl::types::GLint));
        }
    }
    Ok(program)
}
