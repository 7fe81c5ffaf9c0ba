use mandelscope_shared::RenderParams;

const FRACTAL_WGSL: &str = include_str!("gpu/fractal.wgsl");
const ITERATIONS_PLACEHOLDER: &str = "{{MAX_ITERATIONS}}";

/// WGSL source with the iteration budget baked in.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub fn fractal_shader(iterations: u32) -> String {
    let iterations = RenderParams::clamp_iterations(iterations);
    FRACTAL_WGSL.replace(ITERATIONS_PLACEHOLDER, &iterations.to_string())
}
