use std::collections::HashMap;

/// An interned symbol name. Two symbols with the same spelling always carry
/// the same id, so `eq?` on symbols is an integer compare.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Sym(u32);

#[derive(Default)]
pub struct SymbolTable {
    names: Vec<String>,
    ids: HashMap<String, Sym>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    pub fn intern(&mut self, name: &str) -> Sym {
        if let Some(&sym) = self.ids.get(name) {
            return sym;
        }
        let sym = Sym(self.names.len() as u32);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), sym);
        sym
    }

    pub fn name(&self, sym: Sym) -> &str {
        &self.names[sym.0 as usize]
    }
}
