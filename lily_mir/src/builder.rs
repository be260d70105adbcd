//! A small builder for assembling functions block by block. Used by the
//! interpreter tests; the production lowering emits the same shapes.

use indexmap::IndexMap;

use crate::{Block, BlockLimit, Dt, Fun, Inst};

pub struct FunBuilder {
    name: String,
    params: Vec<Dt>,
    ret: Dt,
    insts: IndexMap<String, Inst>,
    next_limit_id: usize,
}

impl FunBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        FunBuilder {
            name: name.into(),
            params: Vec::new(),
            ret: Dt::Unit,
            insts: IndexMap::new(),
            next_limit_id: 0,
        }
    }

    pub fn param(mut self, dt: Dt) -> Self {
        self.params.push(dt);
        self
    }

    pub fn ret(mut self, dt: Dt) -> Self {
        self.ret = dt;
        self
    }

    /// Append a block with a fresh limit id.
    pub fn block(self, name: impl Into<String>, insts: Vec<Inst>) -> Self {
        let limit_id = self.next_limit_id;
        self.block_with_limit(name, limit_id, insts)
    }

    /// Append a block sharing an existing limit id (loop back-edges).
    pub fn block_with_limit(
        mut self,
        name: impl Into<String>,
        limit_id: usize,
        insts: Vec<Inst>,
    ) -> Self {
        let name = name.into();
        self.next_limit_id = self.next_limit_id.max(limit_id + 1);
        self.insts.insert(
            name.clone(),
            Inst::Block(Block {
                name,
                limit: BlockLimit { id: limit_id },
                insts,
            }),
        );
        self
    }

    pub fn finish(self) -> Fun {
        let fun = Fun {
            name: self.name,
            params: self.params,
            ret: self.ret,
            insts: self.insts,
        };
        debug_assert_eq!(fun.check_terminators(), Ok(()));
        fun
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{Dt, Inst, MirError, Val};

    use super::*;

    #[test]
    fn builder_orders_blocks_and_assigns_limits() {
        let fun = FunBuilder::new("main")
            .ret(Dt::I32)
            .block(
                "entry",
                vec![Inst::val(Val::int(Dt::I32, 1)), Inst::Jmp("exit".to_owned())],
            )
            .block("exit", vec![Inst::ret(Inst::val(Val::int(Dt::I32, 0)))])
            .finish();

        assert_eq!(fun.block_count(), 2);
        assert_eq!(fun.entry_block().unwrap().name, "entry");
        assert_eq!(fun.block("exit").unwrap().limit.id, 1);
        assert_eq!(fun.block_frame_len(), 2);
    }

    #[test]
    fn shared_limits_do_not_grow_the_frame() {
        let fun = FunBuilder::new("loop")
            .block("entry", vec![Inst::Jmp("body".to_owned())])
            .block_with_limit("body", 0, vec![Inst::ret(Inst::val(Val::unit()))])
            .finish();
        assert_eq!(fun.block_frame_len(), 1);
    }

    #[test]
    fn terminator_check_rejects_open_blocks() {
        let fun = Fun {
            name: "bad".to_owned(),
            params: vec![],
            ret: Dt::Unit,
            insts: IndexMap::from([(
                "entry".to_owned(),
                Inst::Block(Block {
                    name: "entry".to_owned(),
                    limit: BlockLimit { id: 0 },
                    insts: vec![Inst::val(Val::unit())],
                }),
            )]),
        };
        assert_eq!(
            fun.check_terminators(),
            Err(MirError::MissingTerminator {
                block: "entry".to_owned()
            })
        );
    }

    #[test]
    fn terminator_check_rejects_trailing_insts() {
        let fun = Fun {
            name: "bad".to_owned(),
            params: vec![],
            ret: Dt::Unit,
            insts: IndexMap::from([(
                "entry".to_owned(),
                Inst::Block(Block {
                    name: "entry".to_owned(),
                    limit: BlockLimit { id: 0 },
                    insts: vec![
                        Inst::ret(Inst::val(Val::unit())),
                        Inst::val(Val::unit()),
                        Inst::ret(Inst::val(Val::unit())),
                    ],
                }),
            )]),
        };
        assert_eq!(
            fun.check_terminators(),
            Err(MirError::InstAfterTerminator {
                block: "entry".to_owned()
            })
        );
    }
}
