use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

use mlp_kernel::{Activation, Batch, MlpBuilder, Optimizer, TrainConfig};

struct CountingAlloc {
    allocs: AtomicUsize,
    reallocs: AtomicUsize,
}

impl CountingAlloc {
    const fn new() -> Self {
        Self {
            allocs: AtomicUsize::new(0),
            reallocs: AtomicUsize::new(0),
        }
    }

    fn reset(&self) {
        self.allocs.store(0, Ordering::Relaxed);
        self.reallocs.store(0, Ordering::Relaxed);
    }

    fn events(&self) -> usize {
        self.allocs.load(Ordering::Relaxed) + self.reallocs.load(Ordering::Relaxed)
    }
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        self.reallocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

#[global_allocator]
static ALLOC: CountingAlloc = CountingAlloc::new();

#[test]
fn training_steps_do_not_allocate_once_buffers_exist() {
    if cfg!(feature = "matrixmultiply") {
        // The `matrixmultiply` backend may allocate packing buffers.
        return;
    }

    let input_dim = 16;
    let classes = 4;
    let rows = 8;

    let mut mlp = MlpBuilder::new(input_dim)
        .unwrap()
        .hidden(32)
        .unwrap()
        .activation(Activation::Tanh)
        .optimizer(Optimizer::Nesterov { momentum: 0.9 })
        .classifier(classes)
        .unwrap()
        .build_with_seed(0)
        .unwrap();

    let inputs = vec![0.1; rows * input_dim];
    let targets: Vec<f64> = (0..rows)
        .flat_map(|i| (0..classes).map(move |c| if c == i % classes { 1.0 } else { 0.0 }))
        .collect();
    let batch = Batch::from_flat(inputs, targets, input_dim, classes).unwrap();
    let mut trainer = mlp.trainer(TrainConfig { lambda: 1e-3 }).unwrap();

    // Warm-up so anything lazily initialized is already in place.
    trainer.loss_and_update_model(&mut mlp, &batch, 0.05).unwrap();

    ALLOC.reset();
    trainer.loss_and_update_model(&mut mlp, &batch, 0.05).unwrap();
    let one_step = ALLOC.events();

    ALLOC.reset();
    for _ in 0..64 {
        trainer.loss_and_update_model(&mut mlp, &batch, 0.05).unwrap();
    }
    let many_steps = ALLOC.events();

    assert_eq!(
        one_step, many_steps,
        "allocation count should not grow with the number of steps"
    );
}
