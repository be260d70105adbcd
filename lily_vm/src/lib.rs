//! The stack-based interpreter over lowered MIR.
//!
//! One operand stack, a chain of call frames, per-block stack extents. The
//! dispatch loop is a `match` over the instruction kind; nested
//! instructions (`reg`, `var`, `ret`) evaluate their inner instruction by
//! direct recursion and the returned [`Flow`] is the post-action the
//! original queues through `next_label`.
//!
//! Stack discipline: entering a block records the stack length in its
//! block frame; leaving it pops back to that length, so a block's net
//! stack effect is zero except for values it hands to a terminator.

use lily_config::Conf;
use lily_mir::{Dt, Fun, Inst, Module, Val, ValKind};

mod error;
mod memory;
mod resources;
mod stack;
mod value;

pub use error::{RuntimeError, RuntimeErrorKind, RuntimeResult};
pub use memory::Memory;
pub use resources::Resources;
pub use stack::{clean_block_stack, BlockFrame, FrameReturn, Stack, StackFrame};
pub use value::{Instance, Obj, Value};

use error::unreachable_inst;

/// What an instruction asks the block loop to do next.
#[derive(Clone, Debug, PartialEq)]
enum Flow {
    Continue,
    Jump(String),
    Return,
}

pub struct Vm<'m> {
    module: &'m Module,
    memory: Memory,
    stack: Stack,
    frames: Vec<StackFrame>,
    resources: Resources,
    check_overflow: bool,
}

macro_rules! int_binop {
    ($vm:expr, $checked:ident, $wrapping:ident) => {{
        let rhs = $vm.stack.pop()?;
        let lhs = $vm.stack.pop()?;
        debug_assert!(
            lhs.same_kind(&rhs),
            "integer op on {} and {}",
            lhs.kind_name(),
            rhs.kind_name()
        );
        let check = $vm.check_overflow;
        let result = match (lhs, rhs) {
            (Value::Int8(a), Value::Int8(b)) => Value::Int8(if check {
                a.$checked(b).ok_or(RuntimeErrorKind::Overflow)?
            } else {
                a.$wrapping(b)
            }),
            (Value::Int16(a), Value::Int16(b)) => Value::Int16(if check {
                a.$checked(b).ok_or(RuntimeErrorKind::Overflow)?
            } else {
                a.$wrapping(b)
            }),
            (Value::Int32(a), Value::Int32(b)) => Value::Int32(if check {
                a.$checked(b).ok_or(RuntimeErrorKind::Overflow)?
            } else {
                a.$wrapping(b)
            }),
            (Value::Int64(a), Value::Int64(b)) => Value::Int64(if check {
                a.$checked(b).ok_or(RuntimeErrorKind::Overflow)?
            } else {
                a.$wrapping(b)
            }),
            (Value::Isize(a), Value::Isize(b)) => Value::Isize(if check {
                a.$checked(b).ok_or(RuntimeErrorKind::Overflow)?
            } else {
                a.$wrapping(b)
            }),
            (Value::Uint8(a), Value::Uint8(b)) => Value::Uint8(if check {
                a.$checked(b).ok_or(RuntimeErrorKind::Overflow)?
            } else {
                a.$wrapping(b)
            }),
            (Value::Uint16(a), Value::Uint16(b)) => Value::Uint16(if check {
                a.$checked(b).ok_or(RuntimeErrorKind::Overflow)?
            } else {
                a.$wrapping(b)
            }),
            (Value::Uint32(a), Value::Uint32(b)) => Value::Uint32(if check {
                a.$checked(b).ok_or(RuntimeErrorKind::Overflow)?
            } else {
                a.$wrapping(b)
            }),
            (Value::Uint64(a), Value::Uint64(b)) => Value::Uint64(if check {
                a.$checked(b).ok_or(RuntimeErrorKind::Overflow)?
            } else {
                a.$wrapping(b)
            }),
            (Value::Usize(a), Value::Usize(b)) => Value::Usize(if check {
                a.$checked(b).ok_or(RuntimeErrorKind::Overflow)?
            } else {
                a.$wrapping(b)
            }),
            (lhs, rhs) => {
                return Err(unreachable_inst(format!(
                    "expected Int... or Uint..., got {} and {}",
                    lhs.kind_name(),
                    rhs.kind_name()
                )))
            }
        };
        $vm.stack.push(result)?;
    }};
}

macro_rules! divrem_arm {
    ($a:expr, $b:expr, $variant:path, $checked:ident, $wrapping:ident, $check:expr) => {{
        if $b == 0 {
            return Err(RuntimeErrorKind::DivisionByZero.into());
        }
        $variant(if $check {
            $a.$checked($b).ok_or(RuntimeErrorKind::Overflow)?
        } else {
            $a.$wrapping($b)
        })
    }};
}

macro_rules! int_divrem {
    ($vm:expr, $checked:ident, $wrapping:ident) => {{
        let rhs = $vm.stack.pop()?;
        let lhs = $vm.stack.pop()?;
        debug_assert!(lhs.same_kind(&rhs));
        let check = $vm.check_overflow;
        let result = match (lhs, rhs) {
            (Value::Int8(a), Value::Int8(b)) => {
                divrem_arm!(a, b, Value::Int8, $checked, $wrapping, check)
            }
            (Value::Int16(a), Value::Int16(b)) => {
                divrem_arm!(a, b, Value::Int16, $checked, $wrapping, check)
            }
            (Value::Int32(a), Value::Int32(b)) => {
                divrem_arm!(a, b, Value::Int32, $checked, $wrapping, check)
            }
            (Value::Int64(a), Value::Int64(b)) => {
                divrem_arm!(a, b, Value::Int64, $checked, $wrapping, check)
            }
            (Value::Isize(a), Value::Isize(b)) => {
                divrem_arm!(a, b, Value::Isize, $checked, $wrapping, check)
            }
            (Value::Uint8(a), Value::Uint8(b)) => {
                divrem_arm!(a, b, Value::Uint8, $checked, $wrapping, check)
            }
            (Value::Uint16(a), Value::Uint16(b)) => {
                divrem_arm!(a, b, Value::Uint16, $checked, $wrapping, check)
            }
            (Value::Uint32(a), Value::Uint32(b)) => {
                divrem_arm!(a, b, Value::Uint32, $checked, $wrapping, check)
            }
            (Value::Uint64(a), Value::Uint64(b)) => {
                divrem_arm!(a, b, Value::Uint64, $checked, $wrapping, check)
            }
            (Value::Usize(a), Value::Usize(b)) => {
                divrem_arm!(a, b, Value::Usize, $checked, $wrapping, check)
            }
            (lhs, rhs) => {
                return Err(unreachable_inst(format!(
                    "expected Int... or Uint..., got {} and {}",
                    lhs.kind_name(),
                    rhs.kind_name()
                )))
            }
        };
        $vm.stack.push(result)?;
    }};
}

macro_rules! shift_arm {
    ($a:expr, $b:expr, $variant:path, $checked:ident, $wrapping:ident, $check:expr) => {{
        let amount =
            u32::try_from($b).map_err(|_| RuntimeError::from(RuntimeErrorKind::Overflow))?;
        $variant(if $check {
            $a.$checked(amount).ok_or(RuntimeErrorKind::Overflow)?
        } else {
            $a.$wrapping(amount)
        })
    }};
}

macro_rules! int_shift {
    ($vm:expr, $checked:ident, $wrapping:ident) => {{
        let rhs = $vm.stack.pop()?;
        let lhs = $vm.stack.pop()?;
        debug_assert!(lhs.same_kind(&rhs));
        let check = $vm.check_overflow;
        let result = match (lhs, rhs) {
            (Value::Int8(a), Value::Int8(b)) => {
                shift_arm!(a, b, Value::Int8, $checked, $wrapping, check)
            }
            (Value::Int16(a), Value::Int16(b)) => {
                shift_arm!(a, b, Value::Int16, $checked, $wrapping, check)
            }
            (Value::Int32(a), Value::Int32(b)) => {
                shift_arm!(a, b, Value::Int32, $checked, $wrapping, check)
            }
            (Value::Int64(a), Value::Int64(b)) => {
                shift_arm!(a, b, Value::Int64, $checked, $wrapping, check)
            }
            (Value::Isize(a), Value::Isize(b)) => {
                shift_arm!(a, b, Value::Isize, $checked, $wrapping, check)
            }
            (Value::Uint8(a), Value::Uint8(b)) => {
                shift_arm!(a, b, Value::Uint8, $checked, $wrapping, check)
            }
            (Value::Uint16(a), Value::Uint16(b)) => {
                shift_arm!(a, b, Value::Uint16, $checked, $wrapping, check)
            }
            (Value::Uint32(a), Value::Uint32(b)) => {
                shift_arm!(a, b, Value::Uint32, $checked, $wrapping, check)
            }
            (Value::Uint64(a), Value::Uint64(b)) => {
                shift_arm!(a, b, Value::Uint64, $checked, $wrapping, check)
            }
            (Value::Usize(a), Value::Usize(b)) => {
                shift_arm!(a, b, Value::Usize, $checked, $wrapping, check)
            }
            (lhs, rhs) => {
                return Err(unreachable_inst(format!(
                    "expected Int... or Uint..., got {} and {}",
                    lhs.kind_name(),
                    rhs.kind_name()
                )))
            }
        };
        $vm.stack.push(result)?;
    }};
}

macro_rules! int_bitop {
    ($vm:expr, $op:tt) => {{
        let rhs = $vm.stack.pop()?;
        let lhs = $vm.stack.pop()?;
        debug_assert!(lhs.same_kind(&rhs));
        let result = match (lhs, rhs) {
            (Value::Int8(a), Value::Int8(b)) => Value::Int8(a $op b),
            (Value::Int16(a), Value::Int16(b)) => Value::Int16(a $op b),
            (Value::Int32(a), Value::Int32(b)) => Value::Int32(a $op b),
            (Value::Int64(a), Value::Int64(b)) => Value::Int64(a $op b),
            (Value::Isize(a), Value::Isize(b)) => Value::Isize(a $op b),
            (Value::Uint8(a), Value::Uint8(b)) => Value::Uint8(a $op b),
            (Value::Uint16(a), Value::Uint16(b)) => Value::Uint16(a $op b),
            (Value::Uint32(a), Value::Uint32(b)) => Value::Uint32(a $op b),
            (Value::Uint64(a), Value::Uint64(b)) => Value::Uint64(a $op b),
            (Value::Usize(a), Value::Usize(b)) => Value::Usize(a $op b),
            (lhs, rhs) if lhs.is_bool() && rhs.is_bool() => {
                Value::bool(lhs.as_bool().unwrap() $op rhs.as_bool().unwrap())
            }
            (lhs, rhs) => {
                return Err(unreachable_inst(format!(
                    "expected Int..., Uint... or Bool, got {} and {}",
                    lhs.kind_name(),
                    rhs.kind_name()
                )))
            }
        };
        $vm.stack.push(result)?;
    }};
}

macro_rules! int_cmp {
    ($vm:expr, $op:tt) => {{
        let rhs = $vm.stack.pop()?;
        let lhs = $vm.stack.pop()?;
        debug_assert!(lhs.same_kind(&rhs));
        let result = match (lhs, rhs) {
            (Value::Int8(a), Value::Int8(b)) => a $op b,
            (Value::Int16(a), Value::Int16(b)) => a $op b,
            (Value::Int32(a), Value::Int32(b)) => a $op b,
            (Value::Int64(a), Value::Int64(b)) => a $op b,
            (Value::Isize(a), Value::Isize(b)) => a $op b,
            (Value::Uint8(a), Value::Uint8(b)) => a $op b,
            (Value::Uint16(a), Value::Uint16(b)) => a $op b,
            (Value::Uint32(a), Value::Uint32(b)) => a $op b,
            (Value::Uint64(a), Value::Uint64(b)) => a $op b,
            (Value::Usize(a), Value::Usize(b)) => a $op b,
            (lhs @ (Value::True | Value::False), rhs @ (Value::True | Value::False)) => {
                lhs.as_bool().unwrap() $op rhs.as_bool().unwrap()
            }
            (lhs, rhs) => {
                return Err(unreachable_inst(format!(
                    "expected Int... or Uint..., got {} and {}",
                    lhs.kind_name(),
                    rhs.kind_name()
                )))
            }
        };
        $vm.stack.push(Value::bool(result))?;
    }};
}

macro_rules! float_binop {
    ($vm:expr, $op:tt) => {{
        let rhs = $vm.stack.pop()?;
        let lhs = $vm.stack.pop()?;
        match (lhs, rhs) {
            (Value::Float(a), Value::Float(b)) => $vm.stack.push(Value::Float(a $op b))?,
            (lhs, rhs) => {
                return Err(unreachable_inst(format!(
                    "expected Float64, got {} and {}",
                    lhs.kind_name(),
                    rhs.kind_name()
                )))
            }
        }
    }};
}

macro_rules! float_cmp {
    ($vm:expr, $op:tt) => {{
        let rhs = $vm.stack.pop()?;
        let lhs = $vm.stack.pop()?;
        match (lhs, rhs) {
            (Value::Float(a), Value::Float(b)) => $vm.stack.push(Value::bool(a $op b))?,
            (lhs, rhs) => {
                return Err(unreachable_inst(format!(
                    "expected Float64, got {} and {}",
                    lhs.kind_name(),
                    rhs.kind_name()
                )))
            }
        }
    }};
}

/// Truncated `fmod`, NaN-propagating, as C's `fmod` behaves.
fn float_mod(a: f64, b: f64) -> f64 {
    a % b
}

impl<'m> Vm<'m> {
    pub fn new(module: &'m Module, conf: &Conf, resources: Resources) -> RuntimeResult<Self> {
        let mut vm = Vm {
            module,
            memory: Memory::new(conf.heap_capacity),
            stack: Stack::new(conf.stack_capacity),
            frames: Vec::new(),
            resources,
            check_overflow: conf.check_overflow,
        };
        vm.load_consts()?;
        Ok(vm)
    }

    /// Pre-populate the pre-frame region with the module's constants, as
    /// named instance objects.
    fn load_consts(&mut self) -> RuntimeResult<()> {
        let module = self.module;
        for (name, val) in module.consts() {
            let value = self.value_of(val)?;
            self.stack.push(Value::instance(name, value))?;
        }
        Ok(())
    }

    /// Execute the `main` entry function to completion.
    pub fn run(&mut self) -> RuntimeResult<Value> {
        let entry = self
            .module
            .fun("main")
            .ok_or_else(|| unreachable_inst("expected `main` entry point"))?;
        log::debug!("run entry `{}`", entry.name);
        match self.call_attached(entry, Vec::new())? {
            FrameReturn::Normal(value) => Ok(value),
            FrameReturn::Raise(_) => Err(unreachable_inst("uncaught raise from `main`")),
        }
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    // -- frames --------------------------------------------------------

    fn call_attached(&mut self, fun: &'m Fun, params: Vec<Value>) -> RuntimeResult<FrameReturn> {
        self.attach_frame(fun, params)?;
        let result = self.run_fun(fun);
        self.detach_frame(result)
    }

    fn attach_frame(&mut self, fun: &Fun, params: Vec<Value>) -> RuntimeResult<()> {
        let entry = fun
            .entry_block()
            .ok_or_else(|| unreachable_inst(format!("function `{}` has no blocks", fun.name)))?;
        let begin = self.stack.len();
        if let Some(caller) = self.frames.last_mut() {
            caller.end = begin;
        }
        log::trace!("attach frame `{}` at {}", fun.name, begin);
        self.frames.push(StackFrame::new(
            &fun.name,
            params,
            begin,
            entry.limit.id,
            &entry.name,
            fun.block_frame_len(),
        ));
        Ok(())
    }

    fn detach_frame(&mut self, result: RuntimeResult<()>) -> RuntimeResult<FrameReturn> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| unreachable_inst("detach without an attached frame"))?;
        result?;
        self.stack.truncate(frame.begin);
        if let Some(caller) = self.frames.last_mut() {
            caller.end = 0;
        }
        log::trace!("detach frame `{}`", frame.name);
        frame
            .return_value
            .ok_or_else(|| unreachable_inst(format!("function `{}` finished without `ret`", frame.name)))
    }

    fn current_frame(&self) -> RuntimeResult<&StackFrame> {
        self.frames
            .last()
            .ok_or_else(|| unreachable_inst("no active stack frame"))
    }

    fn current_frame_mut(&mut self) -> RuntimeResult<&mut StackFrame> {
        self.frames
            .last_mut()
            .ok_or_else(|| unreachable_inst("no active stack frame"))
    }

    // -- block loop ----------------------------------------------------

    fn run_fun(&mut self, fun: &'m Fun) -> RuntimeResult<()> {
        let mut block = fun
            .entry_block()
            .ok_or_else(|| unreachable_inst(format!("function `{}` has no blocks", fun.name)))?;
        loop {
            debug_assert!(!block.insts.is_empty());
            let mut flow = Flow::Continue;
            for inst in &block.insts {
                flow = self.run_inst(fun, inst)?;
                if flow != Flow::Continue {
                    break;
                }
            }
            match flow {
                Flow::Jump(target) => {
                    block = fun
                        .block(&target)
                        .ok_or_else(|| unreachable_inst(format!("unknown block `{target}`")))?;
                }
                Flow::Return => return Ok(()),
                Flow::Continue => {
                    return Err(unreachable_inst(format!(
                        "block `{}` fell through without terminator",
                        block.name
                    )))
                }
            }
        }
    }

    /// Leave the current block for `target`.
    ///
    /// Three shapes, keyed on the target's limit id:
    /// - same limit (loop back-edge): the block's extent is popped back to
    ///   its `begin` and the frame merges the new name;
    /// - an enclosing limit being re-opened (branch join): the stack
    ///   resumes at the length recorded in the enclosing frame's `end`,
    ///   and the departing frame is freed — its scope is exited;
    /// - a fresh limit (entering a nested scope): the current extent stays
    ///   on the stack and a new frame opens on top of it.
    fn jump_to(&mut self, fun: &Fun, target: &str) -> RuntimeResult<()> {
        let block = fun
            .block(target)
            .ok_or_else(|| unreachable_inst(format!("unknown block `{target}`")))?;
        debug_assert!(!block.insts.is_empty());

        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| unreachable_inst("jump without an attached frame"))?;
        let current_id = frame.current_block_frame_limit_id;
        let target_id = block.limit.id;

        if target_id == current_id {
            let block_frame = frame.current_block_frame_mut();
            block_frame.names.push(block.name.clone());
            block_frame.end = 0;
            let begin = block_frame.begin;
            self.stack.truncate(begin);
            return Ok(());
        }

        let reopens_enclosing =
            matches!(&frame.block_frames[target_id], Some(existing) if existing.end != 0);
        if reopens_enclosing {
            let resume_len = {
                let existing = frame.block_frames[target_id]
                    .as_mut()
                    .expect("checked above");
                existing.names.push(block.name.clone());
                let resume_len = existing.end;
                existing.end = 0;
                resume_len
            };
            frame.block_frames[current_id] = None;
            frame.current_block_frame_limit_id = target_id;
            self.stack.truncate(resume_len);
        } else {
            let begin = self.stack.len();
            frame.add_block_frame(target_id, &block.name, begin);
        }
        Ok(())
    }

    // -- dispatch ------------------------------------------------------

    fn run_inst(&mut self, fun: &'m Fun, inst: &'m Inst) -> RuntimeResult<Flow> {
        log::trace!("run {inst:?}");
        match inst {
            Inst::Val(val) => {
                self.push_value(val)?;
                Ok(Flow::Continue)
            }

            // Integer arithmetic.
            Inst::Iadd => {
                int_binop!(self, checked_add, wrapping_add);
                Ok(Flow::Continue)
            }
            Inst::Isub => {
                int_binop!(self, checked_sub, wrapping_sub);
                Ok(Flow::Continue)
            }
            Inst::Imul => {
                int_binop!(self, checked_mul, wrapping_mul);
                Ok(Flow::Continue)
            }
            Inst::Idiv => {
                int_divrem!(self, checked_div, wrapping_div);
                Ok(Flow::Continue)
            }
            Inst::Irem => {
                int_divrem!(self, checked_rem, wrapping_rem);
                Ok(Flow::Continue)
            }
            Inst::Exp => {
                int_shift!(self, checked_pow, wrapping_pow);
                Ok(Flow::Continue)
            }
            Inst::Ineg => {
                let rhs = self.stack.pop()?;
                let check = self.check_overflow;
                let result = match rhs {
                    Value::Int8(a) => Value::Int8(if check {
                        a.checked_neg().ok_or(RuntimeErrorKind::Overflow)?
                    } else {
                        a.wrapping_neg()
                    }),
                    Value::Int16(a) => Value::Int16(if check {
                        a.checked_neg().ok_or(RuntimeErrorKind::Overflow)?
                    } else {
                        a.wrapping_neg()
                    }),
                    Value::Int32(a) => Value::Int32(if check {
                        a.checked_neg().ok_or(RuntimeErrorKind::Overflow)?
                    } else {
                        a.wrapping_neg()
                    }),
                    Value::Int64(a) => Value::Int64(if check {
                        a.checked_neg().ok_or(RuntimeErrorKind::Overflow)?
                    } else {
                        a.wrapping_neg()
                    }),
                    Value::Isize(a) => Value::Isize(if check {
                        a.checked_neg().ok_or(RuntimeErrorKind::Overflow)?
                    } else {
                        a.wrapping_neg()
                    }),
                    other => {
                        return Err(unreachable_inst(format!(
                            "expected signed Int..., got {}",
                            other.kind_name()
                        )))
                    }
                };
                self.stack.push(result)?;
                Ok(Flow::Continue)
            }

            // Integer comparisons.
            Inst::IcmpEq => {
                int_cmp!(self, ==);
                Ok(Flow::Continue)
            }
            Inst::IcmpNe => {
                int_cmp!(self, !=);
                Ok(Flow::Continue)
            }
            Inst::IcmpLe => {
                int_cmp!(self, <=);
                Ok(Flow::Continue)
            }
            Inst::IcmpLt => {
                int_cmp!(self, <);
                Ok(Flow::Continue)
            }
            Inst::IcmpGe => {
                int_cmp!(self, >=);
                Ok(Flow::Continue)
            }
            Inst::IcmpGt => {
                int_cmp!(self, >);
                Ok(Flow::Continue)
            }

            // Float arithmetic.
            Inst::Fadd => {
                float_binop!(self, +);
                Ok(Flow::Continue)
            }
            Inst::Fsub => {
                float_binop!(self, -);
                Ok(Flow::Continue)
            }
            Inst::Fmul => {
                float_binop!(self, *);
                Ok(Flow::Continue)
            }
            Inst::Fdiv => {
                float_binop!(self, /);
                Ok(Flow::Continue)
            }
            Inst::Frem => {
                let rhs = self.stack.pop()?;
                let lhs = self.stack.pop()?;
                match (lhs, rhs) {
                    (Value::Float(a), Value::Float(b)) => {
                        self.stack.push(Value::Float(float_mod(a, b)))?;
                    }
                    (lhs, rhs) => {
                        return Err(unreachable_inst(format!(
                            "expected Float64, got {} and {}",
                            lhs.kind_name(),
                            rhs.kind_name()
                        )))
                    }
                }
                Ok(Flow::Continue)
            }
            Inst::Fneg => {
                let rhs = self.stack.pop()?;
                match rhs {
                    Value::Float(a) => self.stack.push(Value::Float(-a))?,
                    other => {
                        return Err(unreachable_inst(format!(
                            "expected Float64, got {}",
                            other.kind_name()
                        )))
                    }
                }
                Ok(Flow::Continue)
            }

            // Float comparisons.
            Inst::FcmpEq => {
                float_cmp!(self, ==);
                Ok(Flow::Continue)
            }
            Inst::FcmpNe => {
                float_cmp!(self, !=);
                Ok(Flow::Continue)
            }
            Inst::FcmpLe => {
                float_cmp!(self, <=);
                Ok(Flow::Continue)
            }
            Inst::FcmpLt => {
                float_cmp!(self, <);
                Ok(Flow::Continue)
            }
            Inst::FcmpGe => {
                float_cmp!(self, >=);
                Ok(Flow::Continue)
            }
            Inst::FcmpGt => {
                float_cmp!(self, >);
                Ok(Flow::Continue)
            }

            // Bit operations.
            Inst::Bitand => {
                int_bitop!(self, &);
                Ok(Flow::Continue)
            }
            Inst::Bitor => {
                int_bitop!(self, |);
                Ok(Flow::Continue)
            }
            Inst::Xor => {
                int_bitop!(self, ^);
                Ok(Flow::Continue)
            }
            Inst::Shl => {
                int_shift!(self, checked_shl, wrapping_shl);
                Ok(Flow::Continue)
            }
            Inst::Shr => {
                int_shift!(self, checked_shr, wrapping_shr);
                Ok(Flow::Continue)
            }
            Inst::Bitnot => {
                let rhs = self.stack.pop()?;
                let result = match rhs {
                    Value::Int8(a) => Value::Int8(!a),
                    Value::Int16(a) => Value::Int16(!a),
                    Value::Int32(a) => Value::Int32(!a),
                    Value::Int64(a) => Value::Int64(!a),
                    Value::Isize(a) => Value::Isize(!a),
                    Value::Uint8(a) => Value::Uint8(!a),
                    Value::Uint16(a) => Value::Uint16(!a),
                    Value::Uint32(a) => Value::Uint32(!a),
                    Value::Uint64(a) => Value::Uint64(!a),
                    Value::Usize(a) => Value::Usize(!a),
                    other => {
                        return Err(unreachable_inst(format!(
                            "expected Int... or Uint..., got {}",
                            other.kind_name()
                        )))
                    }
                };
                self.stack.push(result)?;
                Ok(Flow::Continue)
            }
            Inst::Not => {
                let rhs = self.stack.pop()?;
                let value = rhs.as_bool().ok_or_else(|| {
                    unreachable_inst(format!("expected Bool, got {}", rhs.kind_name()))
                })?;
                self.stack.push(Value::bool(!value))?;
                Ok(Flow::Continue)
            }

            // Control flow.
            Inst::Jmp(target) => {
                self.jump_to(fun, target)?;
                Ok(Flow::Jump(target.clone()))
            }
            Inst::JmpCond {
                cond,
                then_block,
                else_block,
            } => {
                self.push_value(cond)?;
                let cond_value = self.stack.pop()?;
                debug_assert!(cond_value.is_bool());
                let target = if cond_value.as_bool().ok_or_else(|| {
                    unreachable_inst(format!("expected Bool, got {}", cond_value.kind_name()))
                })? {
                    then_block
                } else {
                    else_block
                };
                self.jump_to(fun, target)?;
                Ok(Flow::Jump(target.clone()))
            }
            Inst::Ret(inner) => {
                self.run_inst(fun, inner)?;
                let ret_value = self.stack.pop()?;
                let frame_return = match &ret_value {
                    Value::Object(Obj::Err(payload)) => FrameReturn::Raise((**payload).clone()),
                    _ => FrameReturn::Normal(ret_value),
                };
                let frame = self.current_frame_mut()?;
                frame.set_return(frame_return);
                let begin = frame.current_block_frame().begin;
                frame.free_current_block_frame();
                self.stack.truncate(begin);
                Ok(Flow::Return)
            }
            Inst::Switch {
                val,
                cases,
                default,
            } => {
                let scrutinee = self.value_of(val)?;
                let mut target = default.as_str();
                for case in cases {
                    if self.value_of(&case.val)? == scrutinee {
                        target = &case.target;
                        break;
                    }
                }
                self.jump_to(fun, target)?;
                Ok(Flow::Jump(target.to_owned()))
            }
            Inst::Unreachable => Err(unreachable_inst("reached `unreachable`")),

            // Calls.
            Inst::Call { name, args, .. } => match self.run_call(name, args)? {
                FrameReturn::Normal(value) => {
                    self.stack.push(value)?;
                    Ok(Flow::Continue)
                }
                FrameReturn::Raise(value) => {
                    let frame = self.current_frame_mut()?;
                    frame.set_return(FrameReturn::Raise(value));
                    let begin = frame.current_block_frame().begin;
                    frame.free_current_block_frame();
                    self.stack.truncate(begin);
                    Ok(Flow::Return)
                }
            },
            Inst::Try { inner, catch_block } | Inst::TryPtr { inner, catch_block } => {
                match &**inner {
                    Inst::Call { name, args, .. } => match self.run_call(name, args)? {
                        FrameReturn::Normal(value) => {
                            self.stack.push(value)?;
                            Ok(Flow::Continue)
                        }
                        FrameReturn::Raise(value) => {
                            self.jump_to(fun, catch_block)?;
                            self.stack.push(value)?;
                            Ok(Flow::Jump(catch_block.clone()))
                        }
                    },
                    other => {
                        // Non-raising inner instructions run straight through.
                        self.run_inst(fun, other)
                    }
                }
            }
            Inst::BuiltinCall { name, args, .. } => {
                let values = args
                    .iter()
                    .map(|arg| self.value_of(arg))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                let result = self.run_builtin(name, &values)?;
                self.stack.push(result)?;
                Ok(Flow::Continue)
            }
            Inst::SysCall { name, args, .. } => {
                let values = args
                    .iter()
                    .map(|arg| self.value_of(arg))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                let result = self.run_sys(name, &values)?;
                self.stack.push(result)?;
                Ok(Flow::Continue)
            }

            // Naming.
            Inst::Reg { name, inst } => {
                self.run_inst(fun, inst)?;
                let addr = self.stack.len().checked_sub(1).ok_or_else(|| {
                    unreachable_inst("`reg` inner instruction produced no value")
                })?;
                self.current_frame_mut()?
                    .current_block_frame_mut()
                    .regs
                    .insert(name.clone(), addr);
                Ok(Flow::Continue)
            }
            Inst::Var { name, inst } => {
                self.run_inst(fun, inst)?;
                let addr = self.stack.len().checked_sub(1).ok_or_else(|| {
                    unreachable_inst("`var` inner instruction produced no value")
                })?;
                self.current_frame_mut()?
                    .current_block_frame_mut()
                    .variables
                    .insert(name.clone(), addr);
                Ok(Flow::Continue)
            }
            Inst::Drop(name) => {
                let frame = self.current_frame()?;
                let addr = frame.search_variable(name).ok_or_else(|| {
                    unreachable_inst(format!("drop of unknown variable `{name}`"))
                })?;
                self.stack.set(addr, Value::Undef)?;
                Ok(Flow::Continue)
            }

            // Memory.
            Inst::Alloc(dt) => {
                self.memory.allocate(dt_size(dt))?;
                self.stack.push(Value::Undef)?;
                Ok(Flow::Continue)
            }
            Inst::Load { src, .. } => {
                self.push_value(src)?;
                Ok(Flow::Continue)
            }
            Inst::Store { dest, src } => {
                let value = self.value_of(src)?;
                let ValKind::Var(name) = &dest.kind else {
                    return Err(unreachable_inst("`store` destination must be a var"));
                };
                let frame = self.current_frame()?;
                let addr = frame.search_variable(name).ok_or_else(|| {
                    unreachable_inst(format!("store to unknown variable `{name}`"))
                })?;
                self.stack.set(addr, value)?;
                Ok(Flow::Continue)
            }
            Inst::GetField { src, index } => {
                let value = self.value_of(src)?;
                let item = indexed_item(&value, *index)?;
                self.stack.push(item)?;
                Ok(Flow::Continue)
            }
            Inst::GetArray { src, index } | Inst::GetList { src, index } => {
                let value = self.value_of(src)?;
                let index_value = self.value_of(index)?;
                let index = int_as_usize(&index_value)?;
                let item = indexed_item(&value, index)?;
                self.stack.push(item)?;
                Ok(Flow::Continue)
            }
            Inst::GetSlice { src, lo, hi } => {
                let value = self.value_of(src)?;
                let lo_value = self.value_of(lo)?;
                let hi_value = self.value_of(hi)?;
                let lo = int_as_usize(&lo_value)?;
                let hi = int_as_usize(&hi_value)?;
                match &value {
                    Value::Object(Obj::Array(items)) | Value::Object(Obj::List(items)) => {
                        let items = items.borrow();
                        let slice = items
                            .get(lo..hi)
                            .ok_or_else(|| unreachable_inst("slice out of bounds"))?;
                        self.stack.push(Value::array(slice.to_vec()))?;
                    }
                    other => {
                        return Err(unreachable_inst(format!(
                            "expected array or list, got {}",
                            other.kind_name()
                        )))
                    }
                }
                Ok(Flow::Continue)
            }
            Inst::GetArg(index) => {
                let frame = self.current_frame()?;
                let value = frame.params.get(*index).cloned().ok_or_else(|| {
                    unreachable_inst(format!("argument {index} out of range"))
                })?;
                self.stack.push(value)?;
                Ok(Flow::Continue)
            }
            Inst::GetPtr(src) => {
                self.push_value(src)?;
                Ok(Flow::Continue)
            }
            Inst::RefPtr => {
                let value = self.stack.pop()?;
                self.stack.push(value)?;
                Ok(Flow::Continue)
            }
            Inst::Len => {
                let value = self.stack.pop()?;
                let len = value.object_len().ok_or_else(|| {
                    unreachable_inst(format!("`len` of {}", value.kind_name()))
                })?;
                self.stack.push(Value::Usize(len))?;
                Ok(Flow::Continue)
            }

            // Producers over existing values.
            Inst::MakeRef | Inst::IncTrace => {
                // Sharing is the Rc clone the stack slot already holds.
                let value = self.stack.pop()?;
                self.stack.push(value)?;
                Ok(Flow::Continue)
            }
            Inst::MakeOpt => {
                let value = self.stack.pop()?;
                self.stack.push(value)?;
                Ok(Flow::Continue)
            }
            Inst::MakeOk => {
                let value = self.stack.pop()?;
                self.stack
                    .push(Value::Object(Obj::Ok(std::rc::Rc::new(value))))?;
                Ok(Flow::Continue)
            }
            Inst::MakeErr => {
                let value = self.stack.pop()?;
                self.stack
                    .push(Value::Object(Obj::Err(std::rc::Rc::new(value))))?;
                Ok(Flow::Continue)
            }
            Inst::NonNil => {
                let value = self.stack.pop()?;
                if value == Value::Nil {
                    return Err(unreachable_inst("`non_nil` on nil"));
                }
                self.stack.push(value)?;
                Ok(Flow::Continue)
            }
            Inst::IsOk => {
                let value = self.stack.pop()?;
                self.stack
                    .push(Value::bool(matches!(value, Value::Object(Obj::Ok(_)))))?;
                Ok(Flow::Continue)
            }
            Inst::IsErr => {
                let value = self.stack.pop()?;
                self.stack
                    .push(Value::bool(matches!(value, Value::Object(Obj::Err(_)))))?;
                Ok(Flow::Continue)
            }

            Inst::Trunc { dt } => {
                let value = self.stack.pop()?;
                self.stack.push(trunc_value(&value, dt)?)?;
                Ok(Flow::Continue)
            }
            Inst::Bitcast { dt } => {
                let value = self.stack.pop()?;
                self.stack.push(trunc_value(&value, dt)?)?;
                Ok(Flow::Continue)
            }

            Inst::Asm(_) => Err(unreachable_inst("`asm` is not supported by the interpreter")),
            Inst::Fun(_) | Inst::FunPrototype { .. } | Inst::Block(_) | Inst::Const { .. } => Err(
                unreachable_inst("container instruction inside a block body"),
            ),
        }
    }

    fn run_call(&mut self, name: &str, args: &[Val]) -> RuntimeResult<FrameReturn> {
        let module = self.module;
        let fun = module
            .fun(name)
            .ok_or_else(|| unreachable_inst(format!("call of unknown function `{name}`")))?;
        let params = args
            .iter()
            .map(|arg| self.value_of(arg))
            .collect::<RuntimeResult<Vec<_>>>()?;
        if fun.params.len() != params.len() {
            return Err(unreachable_inst(format!(
                "function `{name}` expects {} args, got {}",
                fun.params.len(),
                params.len()
            )));
        }
        self.call_attached(fun, params)
    }

    fn run_builtin(&mut self, name: &str, args: &[Value]) -> RuntimeResult<Value> {
        match name {
            "len" => {
                let value = args
                    .first()
                    .ok_or_else(|| unreachable_inst("`@builtin.len` expects one arg"))?;
                let len = value.object_len().ok_or_else(|| {
                    unreachable_inst(format!("`@builtin.len` of {}", value.kind_name()))
                })?;
                Ok(Value::Usize(len))
            }
            other => Err(unreachable_inst(format!("unknown builtin `{other}`"))),
        }
    }

    fn run_sys(&mut self, name: &str, args: &[Value]) -> RuntimeResult<Value> {
        match name {
            "exit" => {
                let code = match args.first() {
                    Some(Value::Int32(code)) => *code,
                    Some(other) => int_as_usize(other)? as i32,
                    None => 0,
                };
                Err(RuntimeError::new(RuntimeErrorKind::Exit(code)))
            }
            "write" => {
                use std::io::Write;
                let text = match args.get(1) {
                    Some(Value::Object(Obj::Str(s))) | Some(Value::Object(Obj::CStr(s))) => {
                        s.to_string()
                    }
                    Some(other) => {
                        return Err(unreachable_inst(format!(
                            "`@sys.write` expects Str, got {}",
                            other.kind_name()
                        )))
                    }
                    None => return Err(unreachable_inst("`@sys.write` expects (fd, str)")),
                };
                let written = match args.first() {
                    Some(Value::Int32(2)) => std::io::stderr().write(text.as_bytes()),
                    _ => std::io::stdout().write(text.as_bytes()),
                };
                let written =
                    written.map_err(|_| unreachable_inst("`@sys.write` host io failure"))?;
                Ok(Value::Usize(written))
            }
            "argc" => Ok(Value::Usize(self.resources.args.len())),
            "argv" => {
                let index = args
                    .first()
                    .map(int_as_usize)
                    .transpose()?
                    .unwrap_or_default();
                let arg = self
                    .resources
                    .args
                    .get(index)
                    .ok_or_else(|| unreachable_inst("`@sys.argv` index out of range"))?;
                Ok(Value::str(arg.clone()))
            }
            other => Err(unreachable_inst(format!("unknown sys function `{other}`"))),
        }
    }

    // -- values --------------------------------------------------------

    fn push_value(&mut self, val: &Val) -> RuntimeResult<()> {
        let value = self.value_of(val)?;
        self.stack.push(value)
    }

    fn value_of(&mut self, val: &Val) -> RuntimeResult<Value> {
        match &val.kind {
            ValKind::Int(value) => int_value(&val.dt, *value),
            ValKind::Uint(value) => uint_value(&val.dt, *value),
            ValKind::Float(value) => Ok(Value::Float(*value)),
            ValKind::Str(text) => Ok(Value::str(text.clone())),
            ValKind::CStr(text) => Ok(Value::Object(Obj::CStr(std::rc::Rc::from(
                text.clone().into_boxed_str(),
            )))),
            ValKind::Bytes(bytes) => Ok(Value::Object(Obj::Bytes(std::rc::Rc::from(
                bytes.clone().into_boxed_slice(),
            )))),
            ValKind::Unit => Ok(Value::Unit),
            ValKind::Undef => Ok(Value::Undef),
            ValKind::Nil => Ok(Value::Nil),
            ValKind::Array(items) | ValKind::Tuple(items) | ValKind::Struct(items)
            | ValKind::Slice(items) => {
                let values = items
                    .iter()
                    .map(|item| self.value_of(item))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                Ok(Value::array(values))
            }
            ValKind::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.value_of(item))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                Ok(Value::list(values))
            }
            ValKind::Exception(inner) => {
                let value = self.value_of(inner)?;
                Ok(Value::Object(Obj::Err(std::rc::Rc::new(value))))
            }
            ValKind::Trace(inner) => self.value_of(inner),
            ValKind::Const(name) => self.load_const_value(name),
            ValKind::Param(index) => {
                let frame = self.current_frame()?;
                frame.params.get(*index).cloned().ok_or_else(|| {
                    unreachable_inst(format!("param {index} out of range in `{}`", frame.name))
                })
            }
            ValKind::Reg(name) => {
                let frame = self.current_frame()?;
                let addr = frame
                    .search_reg(name)
                    .ok_or_else(|| unreachable_inst(format!("unknown register `{name}`")))?;
                self.stack
                    .get(addr)
                    .cloned()
                    .ok_or_else(|| unreachable_inst(format!("register `{name}` out of extent")))
            }
            ValKind::Var(name) => {
                let frame = self.current_frame()?;
                let addr = frame
                    .search_variable(name)
                    .ok_or_else(|| unreachable_inst(format!("unknown variable `{name}`")))?;
                self.stack
                    .get(addr)
                    .cloned()
                    .ok_or_else(|| unreachable_inst(format!("variable `{name}` out of extent")))
            }
        }
    }

    /// Constants live as instance objects in the pre-frame region of the
    /// stack.
    fn load_const_value(&mut self, name: &str) -> RuntimeResult<Value> {
        let pre_frame_len = self
            .frames
            .first()
            .map(|frame| frame.begin)
            .unwrap_or_else(|| self.stack.len());
        match self.stack.find_const(pre_frame_len, name) {
            Some(Value::Object(Obj::Instance(instance))) => Ok(instance.value.clone()),
            _ => Err(unreachable_inst(format!(
                "impossible to load const value `{name}`"
            ))),
        }
    }
}

fn int_value(dt: &Dt, value: i64) -> RuntimeResult<Value> {
    Ok(match dt {
        Dt::I1 => Value::bool(value != 0),
        Dt::I8 => Value::Int8(value as i8),
        Dt::I16 => Value::Int16(value as i16),
        Dt::I32 => Value::Int32(value as i32),
        Dt::I64 => Value::Int64(value),
        Dt::Isize => Value::Isize(value as isize),
        other => {
            return Err(unreachable_inst(format!(
                "int val with non-int data type `{other}`"
            )))
        }
    })
}

fn uint_value(dt: &Dt, value: u64) -> RuntimeResult<Value> {
    Ok(match dt {
        Dt::U8 => Value::Uint8(value as u8),
        Dt::U16 => Value::Uint16(value as u16),
        Dt::U32 => Value::Uint32(value as u32),
        Dt::U64 => Value::Uint64(value),
        Dt::Usize => Value::Usize(value as usize),
        other => {
            return Err(unreachable_inst(format!(
                "uint val with non-uint data type `{other}`"
            )))
        }
    })
}

fn int_as_usize(value: &Value) -> RuntimeResult<usize> {
    let converted = match value {
        Value::Int8(v) => usize::try_from(*v).ok(),
        Value::Int16(v) => usize::try_from(*v).ok(),
        Value::Int32(v) => usize::try_from(*v).ok(),
        Value::Int64(v) => usize::try_from(*v).ok(),
        Value::Isize(v) => usize::try_from(*v).ok(),
        Value::Uint8(v) => Some(*v as usize),
        Value::Uint16(v) => Some(*v as usize),
        Value::Uint32(v) => Some(*v as usize),
        Value::Uint64(v) => usize::try_from(*v).ok(),
        Value::Usize(v) => Some(*v),
        _ => None,
    };
    converted.ok_or_else(|| unreachable_inst(format!("expected index, got {}", value.kind_name())))
}

fn indexed_item(value: &Value, index: usize) -> RuntimeResult<Value> {
    match value {
        Value::Object(Obj::Array(items)) | Value::Object(Obj::List(items)) => items
            .borrow()
            .get(index)
            .cloned()
            .ok_or_else(|| unreachable_inst(format!("index {index} out of bounds"))),
        other => Err(unreachable_inst(format!(
            "expected array or list, got {}",
            other.kind_name()
        ))),
    }
}

fn trunc_value(value: &Value, dt: &Dt) -> RuntimeResult<Value> {
    let wide: i128 = match value {
        Value::Int8(v) => *v as i128,
        Value::Int16(v) => *v as i128,
        Value::Int32(v) => *v as i128,
        Value::Int64(v) => *v as i128,
        Value::Isize(v) => *v as i128,
        Value::Uint8(v) => *v as i128,
        Value::Uint16(v) => *v as i128,
        Value::Uint32(v) => *v as i128,
        Value::Uint64(v) => *v as i128,
        Value::Usize(v) => *v as i128,
        Value::True => 1,
        Value::False => 0,
        other => {
            return Err(unreachable_inst(format!(
                "trunc of {}",
                other.kind_name()
            )))
        }
    };
    Ok(match dt {
        Dt::I1 => Value::bool(wide != 0),
        Dt::I8 => Value::Int8(wide as i8),
        Dt::I16 => Value::Int16(wide as i16),
        Dt::I32 => Value::Int32(wide as i32),
        Dt::I64 => Value::Int64(wide as i64),
        Dt::Isize => Value::Isize(wide as isize),
        Dt::U8 => Value::Uint8(wide as u8),
        Dt::U16 => Value::Uint16(wide as u16),
        Dt::U32 => Value::Uint32(wide as u32),
        Dt::U64 => Value::Uint64(wide as u64),
        Dt::Usize => Value::Usize(wide as usize),
        other => {
            return Err(unreachable_inst(format!(
                "trunc to non-int data type `{other}`"
            )))
        }
    })
}

/// Rough lowered size used for heap accounting.
fn dt_size(dt: &Dt) -> usize {
    match dt {
        Dt::I1 | Dt::I8 | Dt::U8 => 1,
        Dt::I16 | Dt::U16 => 2,
        Dt::I32 | Dt::U32 | Dt::CVoid => 4,
        Dt::I64 | Dt::U64 | Dt::Isize | Dt::Usize | Dt::F64 => 8,
        Dt::Unit => 0,
        Dt::Str(len) | Dt::Bytes(len) => *len,
        Dt::CStr => 8,
        Dt::Array(len, inner) => len * dt_size(inner),
        Dt::List(_) => 24,
        Dt::Tuple(items) | Dt::Struct(items) => items.iter().map(dt_size).sum(),
        Dt::Ptr(_) | Dt::Ref(_) | Dt::Trace(_) => 8,
        Dt::Result { ok, err } => dt_size(ok).max(dt_size(err)) + 8,
        Dt::Optional(inner) => dt_size(inner) + 8,
        Dt::Exception(ok, err) => dt_size(ok).max(dt_size(err)) + 8,
        Dt::Any => 16,
    }
}
