use crate::glam::IVec2;

macro_rules! def_units {
    ($t: ident, $doc: literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
        pub struct $t<T>(pub T);

        impl<T> $t<T> {
            pub fn into_inner(self) -> T {
                self.0
            }

            pub fn map<S>(self, mut f: impl FnMut(T) -> S) -> $t<S> {
                $t(f(self.0))
            }

            pub fn combine<S, R>(u1: Self, u2: $t<S>, mut f: impl FnMut(T, S) -> R) -> $t<R> {
                $t(f(u1.into_inner(), u2.into_inner()))
            }
        }
    };
}

def_units!(BlockUnits, "Denotes that the inner `T` is given in units of blocks.");
def_units!(ChunkUnits, "Denotes that the inner `T` is given in units of chunks (16 blocks).");

/// Horizontal position of a chunk column.
pub type ChunkPos = ChunkUnits<IVec2>;

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        ChunkUnits(IVec2::new(x, z))
    }

    pub fn x(&self) -> i32 {
        self.0.x
    }

    pub fn z(&self) -> i32 {
        self.0.y
    }
}

impl From<IVec2> for ChunkPos {
    fn from(p: IVec2) -> Self {
        ChunkUnits(p)
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.0.x, self.0.y)
    }
}
