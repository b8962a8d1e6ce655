//! End-to-end execution tests: module binding, step loops, breakpoints,
//! trap stickiness, and heap snapshots across a run.

use std::rc::Rc;

use wasmstep::{
    heap_data_from_wasm, CompiledFunction, Heap, HeapData, HeapSegment, Instruction, Module, Value,
    ValueType, Vm, VmError, VmState,
};
use wasmstep_runtime::{ByteInputStream, ByteOutputStream};

/// A `main` that increments the i32 cell at address 0 until it reaches 10.
///
/// Equivalent source:
///   loop { mem[0] += 1 } while mem[0] < 10
fn increment_ten_module() -> Module {
    let mut module = Module::with_heap_data(HeapData::new(16, vec![]));
    module.add_function(CompiledFunction {
        name: "main".to_string(),
        params: vec![],
        result: None,
        locals: vec![],
        code: vec![
            Instruction::I32Const(0),            // 0: store address
            Instruction::I32Const(0),            // 1: load address
            Instruction::I32Load { offset: 0 },  // 2: [addr, cell]
            Instruction::I32Const(1),            // 3
            Instruction::I32Add,                 // 4: [addr, cell+1]
            Instruction::I32Store { offset: 0 }, // 5: []
            Instruction::I32Const(0),            // 6
            Instruction::I32Load { offset: 0 },  // 7: [cell]
            Instruction::I32Const(10),           // 8
            Instruction::I32LtU,                 // 9: [cell < 10]
            Instruction::BranchIf { target: 0 }, // 10: loop back
            Instruction::End,                    // 11
        ],
    });
    module
}

#[test]
fn step_loop_increments_cell_ten_times() {
    let module = increment_ten_module();
    let mut state = VmState::new();
    state.use_module(&module).unwrap();
    let vm = Vm::new(module);
    state.start_at_function(&vm, 0).unwrap();

    state.step_until_finished(false);

    assert!(!state.got_trap());
    assert_eq!(state.trap_reason(), "");
    assert_eq!(state.heap().get::<i32>(0), Ok(10));
    assert!(state.instruction_counter().value() >= 10);
}

#[test]
fn breakpoint_stops_the_run_early() {
    let module = increment_ten_module();
    let mut state = VmState::new();
    state.use_module(&module).unwrap();
    let vm = Vm::new(module);
    state.start_at_function(&vm, 0).unwrap();
    // Break right after the store of the first iteration.
    state.thread_mut().add_breakpoint(0, 6);

    state.step_until_finished(true);

    assert!(!state.thread().finished());
    assert_eq!(state.heap().get::<i32>(0), Ok(1));
    let frame = state.thread().frames().last().unwrap();
    assert_eq!(frame.pc, 6);

    // Resuming without breakpoint checking runs to completion.
    state.step_until_finished(false);
    assert_eq!(state.heap().get::<i32>(0), Ok(10));
}

#[test]
fn trap_is_sticky_and_terminates_the_loop() {
    let mut module = Module::with_heap_data(HeapData::new(16, vec![]));
    module.add_function(CompiledFunction {
        name: "main".to_string(),
        params: vec![],
        result: None,
        locals: vec![],
        code: vec![
            Instruction::I32Const(12),
            Instruction::I64Const(0),
            // effective address 12 + 8 overruns the 16-byte heap
            Instruction::I64Store { offset: 8 },
            Instruction::End,
        ],
    });
    let mut state = VmState::new();
    state.use_module(&module).unwrap();
    let vm = Vm::new(module);
    state.start_at_function(&vm, 0).unwrap();

    state.step_until_finished(false);

    assert!(state.got_trap());
    assert_eq!(state.trap_reason(), "memory access out of bounds");
    // The failed store left the heap untouched.
    assert!(state.heap().as_slice().iter().all(|&b| b == 0));

    // Finished by convention; further steps return false but still count.
    let counter_before = state.instruction_counter().value();
    assert!(!state.step());
    assert_eq!(state.instruction_counter().value(), counter_before + 1);
    assert!(state.got_trap());
}

#[test]
fn module_from_wat_seeds_the_heap() {
    let wasm = wat::parse_str(
        r#"
        (module
            (memory 1)
            (data (i32.const 4) "\2a\00\00\00")
        )
        "#,
    )
    .unwrap();
    let heap_data = heap_data_from_wasm(&wasm).unwrap();
    let mut module = Module::with_heap_data(heap_data);
    module.add_function(CompiledFunction {
        name: "read_answer".to_string(),
        params: vec![],
        result: Some(ValueType::I32),
        locals: vec![],
        code: vec![
            Instruction::I32Const(0),
            Instruction::I32Load { offset: 4 },
            Instruction::End,
        ],
    });

    let mut state = VmState::new();
    state.use_module(&module).unwrap();
    let vm = Vm::new(module);
    state.start_at_function(&vm, 0).unwrap();
    state.step_until_finished(false);

    assert!(!state.got_trap());
    assert_eq!(state.thread().result(), Some(Value::I32(42)));
}

#[test]
fn two_heap_modules_are_rejected() {
    let first = Module::with_heap_data(HeapData::new(16, vec![]));
    let second = Module::with_heap_data(HeapData::new(32, vec![]));
    let mut state = VmState::new();
    state.use_module(&first).unwrap();
    assert!(matches!(
        state.use_module(&second),
        Err(VmError::MultipleHeapModules)
    ));
    // The first module's heap survives the failed bind.
    assert_eq!(state.heap().size(), 16);
}

#[test]
fn heap_snapshot_rewinds_memory_mid_run() {
    let module = increment_ten_module();
    let mut state = VmState::new();
    state.use_module(&module).unwrap();
    let vm = Vm::new(module);
    state.start_at_function(&vm, 0).unwrap();

    // One full loop iteration: cell == 1.
    for _ in 0..11 {
        state.step();
    }
    assert_eq!(state.heap().get::<i32>(0), Ok(1));

    let mut snapshot = ByteOutputStream::new();
    state.heap().serialize(&mut snapshot);
    let snapshot = snapshot.into_bytes();

    state.step_until_finished(false);
    assert_eq!(state.heap().get::<i32>(0), Ok(10));

    let mut input = ByteInputStream::new(&snapshot);
    state.heap_mut().set_state(&mut input).unwrap();
    assert_eq!(state.heap().get::<i32>(0), Ok(1));

    let expected = Heap::from_data(&HeapData::new(
        16,
        vec![HeapSegment::new(0, vec![1, 0, 0, 0])],
    ))
    .unwrap();
    assert_eq!(*state.heap(), expected);
}

#[test]
fn start_at_function_with_arguments() {
    let mut module = Module::new();
    module.add_function(CompiledFunction {
        name: "sum3".to_string(),
        params: vec![ValueType::I32, ValueType::I32, ValueType::I32],
        result: Some(ValueType::I32),
        locals: vec![],
        code: vec![
            Instruction::LocalGet(0),
            Instruction::LocalGet(1),
            Instruction::I32Add,
            Instruction::LocalGet(2),
            Instruction::I32Add,
            Instruction::End,
        ],
    });
    let vm: Rc<Vm> = Vm::new(module);

    let mut state = VmState::new();
    state
        .start_at_function_with(&vm, 0, &[Value::I32(1), Value::I32(2), Value::I32(3)])
        .unwrap();
    state.step_until_finished(false);
    assert_eq!(state.thread().result(), Some(Value::I32(6)));
}
