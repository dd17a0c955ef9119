use std::ffi::c_int;

/// Hands the frame callback to the browser, which calls it once per
/// animation frame. Never returns.
pub fn set_main_loop(frame: FrameCallback) -> ! {
    unsafe { emscripten_set_main_loop(frame, 0, 1) };
    // With simulate_infinite_loop set, emscripten unwinds the caller with an
    // exception instead of returning here.
    loop {}
}

pub type FrameCallback = extern "C" fn();
extern "C" {
    /// https://emscripten.org/docs/api_reference/emscripten.h.html#c.emscripten_set_main_loop
    fn emscripten_set_main_loop(func: FrameCallback, fps: c_int, simulate_infinite_loop: c_int);
}
